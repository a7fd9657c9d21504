//! Percent-decoding of query-string keys and values.
//!
//! spec.md treats URL-percent-decoding as an external routine but gives its
//! full contract: given a scratch buffer and a source slice, return either a
//! borrowed view into the source (no escapes present) or a written view
//! into the scratch (escapes expanded), falling back to an arena allocation
//! when the scratch tail is too small. This module implements that contract
//! directly against [`crate::store::Loc`] rather than returning an actual
//! slice, so the caller never has to hold two overlapping borrows of the
//! same static buffer (one for the escaped source, one for the decoded
//! destination) at once (see DESIGN.md).

use crate::arena::Arena;
use crate::store::Loc;

/// Result of decoding one query key or value.
pub struct Unescaped {
    pub loc: Loc,
    /// `true` when bytes were written into scratch or the arena; `false`
    /// when `loc` borrows the source unchanged (no escapes present).
    pub buffered: bool,
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// `true` if `src` contains a decodable `%XX` escape (invalid escapes, a
/// trailing `%` or non-hex digits, are not escapes and pass through
/// literally).
fn has_escape(src: &[u8]) -> bool {
    decoded_len(src) != src.len()
}

/// Length of `src` after decoding. Always `<= src.len()` since every
/// three-byte `%XX` escape collapses to one decoded byte.
fn decoded_len(src: &[u8]) -> usize {
    let mut i = 0;
    let mut len = 0;
    while i < src.len() {
        if src[i] == b'%' {
            if let (Some(_), Some(_)) = (
                src.get(i + 1).copied().and_then(hex_digit),
                src.get(i + 2).copied().and_then(hex_digit),
            ) {
                i += 3;
                len += 1;
                continue;
            }
        }
        i += 1;
        len += 1;
    }
    len
}

/// Decode `src` into `dest`. `dest.len()` MUST equal `decoded_len(src)`.
fn decode_into(src: &[u8], dest: &mut [u8]) {
    let mut i = 0;
    let mut out = 0;
    while i < src.len() {
        if src[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                src.get(i + 1).copied().and_then(hex_digit),
                src.get(i + 2).copied().and_then(hex_digit),
            ) {
                dest[out] = (hi << 4) | lo;
                out += 1;
                i += 3;
                continue;
            }
        }
        dest[out] = src[i];
        out += 1;
        i += 1;
    }
    debug_assert_eq!(out, dest.len());
}

/// Decode the bytes at `buf[src_start..src_end]`.
///
/// If no escapes are present, returns a [`Loc::Buf`] borrowing the source
/// range directly (no copy). Otherwise writes the decoded bytes into
/// `buf[*scratch_cursor..scratch_end]` and advances `*scratch_cursor` by the
/// written length, or (if that tail is too small) allocates exactly
/// enough space from `arena` and writes there instead.
#[allow(clippy::too_many_arguments)]
pub fn unescape(
    arena: &mut Arena,
    buf: &mut [u8],
    src_start: usize,
    src_end: usize,
    scratch_cursor: &mut usize,
    scratch_end: usize,
) -> Unescaped {
    let src_len = src_end - src_start;
    if src_len == 0 {
        return Unescaped {
            loc: Loc::Buf(src_start, src_end),
            buffered: false,
        };
    }

    // Borrow the source bytes transiently to decide/compute; this borrow
    // ends before we touch `buf` again.
    let (needs_decode, out_len) = {
        let src = &buf[src_start..src_end];
        (has_escape(src), decoded_len(src))
    };

    if !needs_decode {
        return Unescaped {
            loc: Loc::Buf(src_start, src_end),
            buffered: false,
        };
    }

    if scratch_end.saturating_sub(*scratch_cursor) >= out_len {
        let dest_start = *scratch_cursor;
        let dest_end = dest_start + out_len;
        // Decode from the (disjoint) source range into the scratch range of
        // the very same buffer. The tripartite buffer invariant guarantees
        // `[src_start, src_end)` and `[dest_start, dest_end)` never overlap.
        let mut tmp = vec![0u8; out_len];
        decode_into(&buf[src_start..src_end], &mut tmp);
        buf[dest_start..dest_end].copy_from_slice(&tmp);
        *scratch_cursor = dest_end;
        return Unescaped {
            loc: Loc::Buf(dest_start, dest_end),
            buffered: true,
        };
    }

    let idx = arena.alloc(out_len);
    let src_copy = buf[src_start..src_end].to_vec();
    decode_into(&src_copy, arena.get_mut(idx));
    Unescaped {
        loc: Loc::Arena(idx, 0, out_len),
        buffered: true,
    }
}
