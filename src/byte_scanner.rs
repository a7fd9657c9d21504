//! Search for the carriage-return byte within a buffer slice.
//!
//! The header phase of the parser re-scans the unconsumed tail of the
//! static buffer every time more bytes arrive, so this is the hottest loop
//! in the parser. Scanning is branch-tiered on the remaining length: a
//! scalar byte-at-a-time loop for short remainders, and word-at-a-time
//! scans (the SWAR technique: load a native word, XOR against a
//! byte-broadcast needle, detect a zero byte with the classic
//! `(v - 0x0101..) & !v & 0x8080..` trick) for longer ones. This gets most
//! of the benefit of a hand-written SIMD scan without reaching for
//! platform intrinsics or a `target_feature` dance: word-at-a-time
//! operations are portable and the compiler auto-vectorizes the scalar
//! fallback reasonably well regardless.

const CR: u8 = b'\r';

/// Returns the index of the first `\r` byte in `buf`, or `None`.
///
/// Never reads past `buf.len()`. Identical result to a byte-at-a-time scan
/// for every input; see the differential tests below.
pub fn find_carriage_return(buf: &[u8]) -> Option<usize> {
    let mut offset = 0;

    // Tier 1: scan 8 bytes at a time via u64 SWAR while enough remain.
    while buf.len() - offset >= 8 {
        let chunk = &buf[offset..offset + 8];
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        if let Some(i) = first_match_in_word(word) {
            return Some(offset + i);
        }
        offset += 8;
    }

    // Tier 2: scan 4 bytes at a time via u32 SWAR.
    while buf.len() - offset >= 4 {
        let chunk = &buf[offset..offset + 4];
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        if let Some(i) = first_match_in_u32(word) {
            return Some(offset + i);
        }
        offset += 4;
    }

    // Tier 3: scalar fallback for the final 0..4 byte remainder.
    buf[offset..]
        .iter()
        .position(|&b| b == CR)
        .map(|i| offset + i)
}

/// Returns the index (0..8) of the first zero byte in `word` when `word` is
/// `chunk XOR (CR broadcast across 8 bytes)`, or `None` if there is none.
fn first_match_in_word(word: u64) -> Option<usize> {
    const LO: u64 = 0x0101_0101_0101_0101;
    const HI: u64 = 0x8080_8080_8080_8080;
    const NEEDLE: u64 = (CR as u64) * LO;

    let xored = word ^ NEEDLE;
    let has_zero = xored.wrapping_sub(LO) & !xored & HI;
    if has_zero == 0 {
        return None;
    }
    // Index of the first (least significant, i.e. lowest byte offset on a
    // little-endian read) zero byte.
    Some((has_zero.trailing_zeros() / 8) as usize)
}

fn first_match_in_u32(word: u32) -> Option<usize> {
    const LO: u32 = 0x0101_0101;
    const HI: u32 = 0x8080_8080;
    const NEEDLE: u32 = (CR as u32) * LO;

    let xored = word ^ NEEDLE;
    let has_zero = xored.wrapping_sub(LO) & !xored & HI;
    if has_zero == 0 {
        return None;
    }
    Some((has_zero.trailing_zeros() / 8) as usize)
}

#[cfg(test)]
mod test {
    use super::*;

    fn scalar_reference(buf: &[u8]) -> Option<usize> {
        buf.iter().position(|&b| b == CR)
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(find_carriage_return(b""), None);
    }

    #[test]
    fn test_no_cr_present() {
        let buf = vec![b'a'; 200];
        assert_eq!(find_carriage_return(&buf), None);
    }

    #[test]
    fn test_single_cr_every_position_small_buffers() {
        for len in 0..128 {
            for pos in 0..len {
                let mut buf = vec![b'x'; len];
                buf[pos] = CR;
                assert_eq!(
                    find_carriage_return(&buf),
                    scalar_reference(&buf),
                    "mismatch at len={len} pos={pos}"
                );
            }
            // all-no-CR case for this length too
            let buf = vec![b'x'; len];
            assert_eq!(find_carriage_return(&buf), scalar_reference(&buf));
        }
    }

    #[test]
    fn test_cr_at_tier_boundaries() {
        for len in [3, 4, 5, 7, 8, 9, 11, 12, 15, 16, 17] {
            let mut buf = vec![b'z'; len];
            buf[len - 1] = CR;
            assert_eq!(find_carriage_return(&buf), scalar_reference(&buf));
        }
    }

    #[test]
    fn test_does_not_read_past_len() {
        // A buffer whose only CR sits one byte beyond a slice we pass in
        // must not be found.
        let mut backing = vec![b'q'; 32];
        backing[20] = CR;
        let visible = &backing[..16];
        assert_eq!(find_carriage_return(visible), None);
    }
}
