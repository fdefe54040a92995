/*
[INPUT]:  Outbound requests needing correlation
[OUTPUT]: Strictly increasing request ids
[POS]:    Session layer - request/response correlation
[UPDATE]: When id allocation semantics change
*/

/// Allocates request ids for the lifetime of a client; ids are never reset on reconnect.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    last: u64,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, starting at 1
    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}
