/// Splits `[addr, addr + length)` into the fewest pieces that each stay within one cache line.
/// Returns `(address, length)` pairs in address order.
pub fn split_range(addr: u64, length: u64, line: u64) -> Vec<(u64, u64)> {
    debug_assert!(line > 0, "cache line size must be non-zero");
    let end = addr.saturating_add(length);
    let mut parts = Vec::new();
    let mut cur = addr;
    while cur < end {
        let line_end = (cur / line + 1).saturating_mul(line);
        let piece_end = line_end.min(end);
        parts.push((cur, piece_end - cur));
        cur = piece_end;
    }
    parts
}
