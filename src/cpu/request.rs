use serde::Serialize;
use smallvec::SmallVec;

use crate::timeq::Cycle;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReqOperation {
    Read,
    Write,
    Custom,
    Fence,
}

impl ReqOperation {
    /// Kinds that produce memory-interface traffic, in stats-table order.
    pub const MEM_OPS: [ReqOperation; 3] = [Self::Read, Self::Write, Self::Custom];

    pub fn is_mem(self) -> bool {
        !matches!(self, Self::Fence)
    }

    /// Slot in per-kind tables sized by `MEM_OPS`.  Fences have no slot.
    pub fn mem_index(self) -> Option<usize> {
        match self {
            Self::Read => Some(0),
            Self::Write => Some(1),
            Self::Custom => Some(2),
            Self::Fence => None,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::Custom => "c",
            Self::Fence => "f",
        }
    }
}

/// Hands out request ids.  Ids are strictly increasing per generator instance, so an id below
/// `peek()` has already been handed to some request.
#[derive(Debug, Clone, Default)]
pub struct RequestIdGen {
    next: RequestId,
}

impl RequestIdGen {
    pub fn new(start: RequestId) -> Self {
        Self { next: start }
    }

    pub fn next_id(&mut self) -> RequestId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    pub fn peek(&self) -> RequestId {
        self.next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody {
    Read { addr: u64, length: u64 },
    Write { addr: u64, length: u64 },
    Custom { addr: u64, length: u64, opcode: u32 },
    Fence,
}

#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    depends_on: SmallVec<[RequestId; 4]>,
    issue_time: Option<Cycle>,
    body: RequestBody,
}

impl Request {
    fn with_body(ids: &mut RequestIdGen, body: RequestBody) -> Self {
        if let RequestBody::Read { length, .. }
        | RequestBody::Write { length, .. }
        | RequestBody::Custom { length, .. } = body
        {
            debug_assert!(length > 0, "memory requests must cover at least one byte");
        }
        Self {
            id: ids.next_id(),
            depends_on: SmallVec::new(),
            issue_time: None,
            body,
        }
    }

    pub fn read(ids: &mut RequestIdGen, addr: u64, length: u64) -> Self {
        Self::with_body(ids, RequestBody::Read { addr, length })
    }

    pub fn write(ids: &mut RequestIdGen, addr: u64, length: u64) -> Self {
        Self::with_body(ids, RequestBody::Write { addr, length })
    }

    pub fn custom(ids: &mut RequestIdGen, addr: u64, length: u64, opcode: u32) -> Self {
        Self::with_body(
            ids,
            RequestBody::Custom {
                addr,
                length,
                opcode,
            },
        )
    }

    pub fn fence(ids: &mut RequestIdGen) -> Self {
        Self::with_body(ids, RequestBody::Fence)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn operation(&self) -> ReqOperation {
        match self.body {
            RequestBody::Read { .. } => ReqOperation::Read,
            RequestBody::Write { .. } => ReqOperation::Write,
            RequestBody::Custom { .. } => ReqOperation::Custom,
            RequestBody::Fence => ReqOperation::Fence,
        }
    }

    pub fn is_fence(&self) -> bool {
        matches!(self.body, RequestBody::Fence)
    }

    /// `(address, length)` for memory operations, `None` for fences.
    pub fn mem_range(&self) -> Option<(u64, u64)> {
        match self.body {
            RequestBody::Read { addr, length }
            | RequestBody::Write { addr, length }
            | RequestBody::Custom { addr, length, .. } => Some((addr, length)),
            RequestBody::Fence => None,
        }
    }

    pub fn opcode(&self) -> Option<u32> {
        match self.body {
            RequestBody::Custom { opcode, .. } => Some(opcode),
            _ => None,
        }
    }

    pub fn add_dependency(&mut self, id: RequestId) {
        self.depends_on.push(id);
    }

    /// Removes one occurrence of `id`; absent ids are ignored.
    pub fn satisfy_dependency(&mut self, id: RequestId) {
        if let Some(pos) = self.depends_on.iter().position(|dep| *dep == id) {
            self.depends_on.remove(pos);
        }
    }

    pub fn can_issue(&self) -> bool {
        self.depends_on.is_empty()
    }

    pub fn dependencies(&self) -> &[RequestId] {
        &self.depends_on
    }

    pub(crate) fn retain_dependencies<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RequestId) -> bool,
    {
        self.depends_on.retain(|dep| keep(dep));
    }

    pub fn set_issue_time(&mut self, now: Cycle) {
        self.issue_time = Some(now);
    }

    pub fn issue_time(&self) -> Option<Cycle> {
        self.issue_time
    }
}
