use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::cpu::request::{ReqOperation, Request, RequestIdGen};
use crate::mem::{MemOp, MemRequest, MemoryManager, PageMapMode};
use crate::traffic::EmptyGenerator;

#[derive(Default)]
struct FakeMem {
    next: SubRequestId,
    issued: Vec<(SubRequestId, MemRequest)>,
}

impl MemoryInterface for FakeMem {
    fn issue(&mut self, _now: Cycle, request: MemRequest) -> SubRequestId {
        let id = self.next + 1000;
        self.next += 1;
        self.issued.push((id, request));
        id
    }
}

impl FakeMem {
    fn ids_for(&self, origin: RequestId) -> Vec<SubRequestId> {
        self.issued
            .iter()
            .filter(|(_, req)| req.origin == origin)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Clone)]
enum Kind {
    Read,
    Write,
    Custom(u32),
    Fence,
}

#[derive(Clone)]
struct Step {
    kind: Kind,
    addr: u64,
    len: u64,
    after: Vec<usize>,
    after_ids: Vec<RequestId>,
}

fn rd(addr: u64, len: u64) -> Step {
    Step {
        kind: Kind::Read,
        addr,
        len,
        after: Vec::new(),
        after_ids: Vec::new(),
    }
}

fn wr(addr: u64, len: u64) -> Step {
    Step {
        kind: Kind::Write,
        ..rd(addr, len)
    }
}

fn cu(addr: u64, len: u64, opcode: u32) -> Step {
    Step {
        kind: Kind::Custom(opcode),
        ..rd(addr, len)
    }
}

fn fence() -> Step {
    Step {
        kind: Kind::Fence,
        ..rd(0, 1)
    }
}

impl Step {
    fn after(mut self, step_index: usize) -> Self {
        self.after.push(step_index);
        self
    }

    fn after_id(mut self, id: RequestId) -> Self {
        self.after_ids.push(id);
        self
    }
}

/// Emits one scripted batch per `generate` call.  Dependencies name earlier steps by their
/// position across all batches.
struct ScriptedGen {
    batches: VecDeque<Vec<Step>>,
    made: Vec<RequestId>,
    completions: Rc<Cell<u32>>,
}

impl RequestGenerator for ScriptedGen {
    fn generate(&mut self, queue: &mut RequestQueue<Request>, ids: &mut RequestIdGen) {
        let Some(batch) = self.batches.pop_front() else {
            return;
        };
        for step in batch {
            let mut req = match step.kind {
                Kind::Read => Request::read(ids, step.addr, step.len),
                Kind::Write => Request::write(ids, step.addr, step.len),
                Kind::Custom(opcode) => Request::custom(ids, step.addr, step.len, opcode),
                Kind::Fence => Request::fence(ids),
            };
            for idx in step.after {
                req.add_dependency(self.made[idx]);
            }
            for id in step.after_ids {
                req.add_dependency(id);
            }
            self.made.push(req.id());
            queue.push_back(req);
        }
    }

    fn is_finished(&self) -> bool {
        self.batches.is_empty()
    }

    fn completed(&mut self) {
        self.completions.set(self.completions.get() + 1);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn config(max_reqs_cycle: u32) -> CpuConfig {
    CpuConfig {
        max_reqs_cycle,
        ..CpuConfig::default()
    }
}

fn scripted(batches: Vec<Vec<Step>>) -> (Box<ScriptedGen>, Rc<Cell<u32>>) {
    let completions = Rc::new(Cell::new(0));
    let gen = ScriptedGen {
        batches: batches.into(),
        made: Vec::new(),
        completions: Rc::clone(&completions),
    };
    (Box::new(gen), completions)
}

fn make_engine(
    cfg: CpuConfig,
    batches: Vec<Vec<Step>>,
) -> (IssueEngine<FakeMem>, Rc<Cell<u32>>) {
    let (gen, completions) = scripted(batches);
    let engine = IssueEngine::new(&cfg, gen, FakeMem::default(), Arc::new(Logger::silent()))
        .expect("valid config");
    (engine, completions)
}

fn complete_all(engine: &mut IssueEngine<FakeMem>, origin: RequestId, now: Cycle) -> Option<Cycle> {
    let mut last = None;
    for id in engine.mem().ids_for(origin) {
        last = engine.handle_completion(id, now);
    }
    last
}

#[test]
fn line_crossing_read_splits_in_two() {
    let (mut engine, _) = make_engine(config(2), vec![vec![rd(60, 16)]]);
    engine.tick(0);

    let issued: Vec<(u64, u64)> = engine
        .mem()
        .issued
        .iter()
        .map(|(_, req)| (req.addr, req.size))
        .collect();
    assert_eq!(issued, vec![(60, 4), (64, 12)]);
    assert_eq!(engine.inflight_request(0).map(|r| r.count_parts()), Some(2));
    assert_eq!(engine.inflight_parts(), 2);
    assert_eq!(engine.stats().read.split_reqs, 1);
    assert_eq!(engine.stats().read.bytes, 16);
}

#[test]
fn aligned_line_is_not_split() {
    let (mut engine, _) = make_engine(config(2), vec![vec![rd(0, 64)]]);
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.inflight_request(0).map(|r| r.count_parts()), Some(1));
    assert_eq!(engine.stats().read.split_reqs, 0);
}

#[test]
fn split_parts_complete_out_of_order() {
    let (mut engine, _) = make_engine(config(2), vec![vec![rd(60, 16)]]);
    engine.tick(3);
    let ids = engine.mem().ids_for(0);
    assert_eq!(engine.handle_completion(ids[1], 10), None);
    assert_eq!(engine.inflight_request(0).map(|r| r.count_parts()), Some(1));
    assert_eq!(engine.handle_completion(ids[0], 12), Some(9));
    assert_eq!(engine.inflight_requests(), 0);
    assert_eq!(engine.stats().latency.sum, 9);
    assert_eq!(engine.stats().latency.count, 1);
}

#[test]
fn per_cycle_cap_limits_issue() {
    let batch = (0..5).map(|i| rd(i * 64, 8)).collect();
    let (mut engine, _) = make_engine(config(2), vec![batch]);
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.pending().size(), 3);
    assert_eq!(engine.stats().cycles_max_issue, 1);
    assert_eq!(engine.stats().cycles_with_issue, 1);

    engine.tick(1);
    assert_eq!(engine.mem().issued.len(), 4);
    assert_eq!(engine.pending().size(), 1);
}

#[test]
fn dependent_request_waits_for_completion() {
    let (mut engine, _) = make_engine(config(4), vec![vec![rd(0, 8), wr(64, 8).after(0)]]);
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.pending().size(), 1);
    assert!(!engine.pending().at(0).can_issue());

    engine.tick(1);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.stats().cycles_no_issue, 1);

    assert_eq!(complete_all(&mut engine, 0, 5), Some(5));
    assert!(engine.pending().at(0).can_issue());
    engine.tick(6);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.mem().issued[1].1.op, MemOp::Write);
}

#[test]
fn independent_request_passes_blocked_one() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8).after_id(999), rd(64, 8), rd(128, 8)]],
    );
    engine.tick(0);
    let origins: Vec<RequestId> = engine.mem().issued.iter().map(|(_, r)| r.origin).collect();
    assert_eq!(origins, vec![1, 2]);
    assert_eq!(engine.pending().at(0).id(), 0);
}

#[test]
fn fence_blocks_until_earlier_requests_complete() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8), rd(64, 8), fence(), rd(128, 8), rd(192, 8)]],
    );
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.stats().cycles_hit_fence, 1);

    engine.tick(1);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.stats().cycles_hit_fence, 2);

    complete_all(&mut engine, 0, 5);
    engine.tick(6);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.stats().cycles_hit_fence, 3);

    complete_all(&mut engine, 1, 7);
    engine.tick(8);
    let origins: Vec<RequestId> = engine.mem().issued.iter().map(|(_, r)| r.origin).collect();
    assert_eq!(origins, vec![0, 1, 3, 4]);
    assert_eq!(engine.stats().fences_retired, 1);
    assert_eq!(engine.stats().cycles_hit_fence, 3);
    assert!(engine.pending().empty());
}

#[test]
fn fence_waits_for_unissued_requests_ahead_of_it() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8).after_id(999), fence(), rd(64, 8)]],
    );
    engine.tick(0);
    assert!(engine.mem().issued.is_empty());
    assert_eq!(engine.stats().cycles_hit_fence, 1);
    assert_eq!(engine.pending().size(), 3);
}

#[test]
fn fence_with_unmet_dependency_blocks() {
    let (mut engine, _) = make_engine(config(4), vec![vec![fence().after_id(999), rd(0, 8)]]);
    engine.tick(0);
    assert_eq!(engine.stats().fences_retired, 0);
    assert_eq!(engine.stats().cycles_hit_fence, 1);
    assert!(engine.mem().issued.is_empty());
    assert_eq!(engine.pending().size(), 2);
}

#[test]
fn fence_retires_once_its_dependency_completes() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8), fence().after(0), rd(64, 8)]],
    );
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.stats().cycles_hit_fence, 1);

    complete_all(&mut engine, 0, 3);
    assert!(engine.pending().at(0).can_issue());
    engine.tick(4);
    assert_eq!(engine.stats().fences_retired, 1);
    assert_eq!(engine.mem().issued.len(), 2);
    assert!(engine.pending().empty());
}

#[test]
fn leading_fence_with_nothing_in_flight_retires() {
    let (mut engine, _) = make_engine(config(4), vec![vec![fence(), fence(), rd(0, 8)]]);
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.stats().fences_retired, 2);
    assert_eq!(engine.stats().cycles_hit_fence, 0);
}

#[test]
fn per_kind_outstanding_cap() {
    let cfg = CpuConfig {
        max_reqs_cycle: 4,
        maxmemreqpending: 1,
        ..CpuConfig::default()
    };
    let (mut engine, _) = make_engine(cfg, vec![vec![rd(0, 8), rd(64, 8), wr(128, 8)]]);
    engine.tick(0);
    let origins: Vec<RequestId> = engine.mem().issued.iter().map(|(_, r)| r.origin).collect();
    assert_eq!(origins, vec![0, 2]);
    assert_eq!(engine.outstanding(ReqOperation::Read), 1);
    assert_eq!(engine.outstanding(ReqOperation::Write), 1);

    engine.tick(1);
    assert_eq!(engine.mem().issued.len(), 2);

    complete_all(&mut engine, 0, 4);
    assert_eq!(engine.outstanding(ReqOperation::Read), 0);
    engine.tick(5);
    assert_eq!(engine.mem().issued.len(), 3);
}

#[test]
fn custom_op_carries_opcode_and_own_slot() {
    let cfg = CpuConfig {
        max_reqs_cycle: 4,
        maxmemreqpending: 1,
        ..CpuConfig::default()
    };
    let (mut engine, _) = make_engine(
        cfg,
        vec![vec![cu(60, 16, 7), cu(256, 8, 7), rd(512, 8)]],
    );
    engine.tick(0);

    let issued: Vec<(RequestId, MemOp)> = engine
        .mem()
        .issued
        .iter()
        .map(|(_, r)| (r.origin, r.op))
        .collect();
    assert_eq!(
        issued,
        vec![(0, MemOp::Custom(7)), (0, MemOp::Custom(7)), (2, MemOp::Read)]
    );
    assert_eq!(engine.outstanding(ReqOperation::Custom), 1);
    assert_eq!(engine.outstanding(ReqOperation::Read), 1);

    let custom = engine.stats().op(ReqOperation::Custom).copied().unwrap_or_default();
    assert_eq!(custom.reqs, 1);
    assert_eq!(custom.bytes, 16);
    assert_eq!(custom.split_reqs, 1);
    assert_eq!(engine.stats().read.reqs, 1);
    assert!(engine.stats().op(ReqOperation::Fence).is_none());

    complete_all(&mut engine, 0, 5);
    assert_eq!(engine.outstanding(ReqOperation::Custom), 0);
    engine.tick(6);
    assert_eq!(engine.mem().issued[3].1.op, MemOp::Custom(7));
    assert_eq!(engine.stats().custom.reqs, 2);
}

#[test]
fn split_request_holds_one_outstanding_slot() {
    let cfg = CpuConfig {
        max_reqs_cycle: 4,
        maxmemreqpending: 1,
        ..CpuConfig::default()
    };
    let (mut engine, _) = make_engine(cfg, vec![vec![rd(32, 64), rd(256, 8)]]);
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 2);
    assert_eq!(engine.outstanding(ReqOperation::Read), 1);
    let ids = engine.mem().ids_for(0);
    engine.handle_completion(ids[0], 3);
    assert_eq!(engine.outstanding(ReqOperation::Read), 1);
    engine.handle_completion(ids[1], 4);
    assert_eq!(engine.outstanding(ReqOperation::Read), 0);
}

#[test]
fn reorder_window_exhaustion_is_counted() {
    let cfg = CpuConfig {
        max_reqs_cycle: 4,
        max_reorder_lookups: 2,
        ..CpuConfig::default()
    };
    let (mut engine, _) = make_engine(
        cfg,
        vec![vec![
            rd(0, 8).after_id(999),
            rd(64, 8).after_id(999),
            rd(128, 8),
        ]],
    );
    engine.tick(0);
    assert!(engine.mem().issued.is_empty());
    assert_eq!(engine.stats().cycles_no_issue, 1);
    assert_eq!(engine.stats().cycles_max_reorder, 1);
    assert_eq!(engine.stats().cycles, 1);
}

#[test]
fn dependency_on_retired_request_is_dropped() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8)], vec![wr(64, 8).after(0)]],
    );
    engine.tick(0);
    assert_eq!(engine.mem().issued.len(), 1);
    // empty queue: next tick pulls the second batch
    complete_all(&mut engine, 0, 2);
    engine.tick(3);
    assert_eq!(engine.mem().issued.len(), 2);
    assert!(engine.pending().empty());
}

#[test]
fn dependency_on_inflight_request_is_kept() {
    let (mut engine, _) = make_engine(
        config(4),
        vec![vec![rd(0, 8)], vec![wr(64, 8).after(0)]],
    );
    engine.tick(0);
    engine.tick(1);
    assert_eq!(engine.mem().issued.len(), 1);
    assert_eq!(engine.pending().at(0).dependencies(), &[0]);
    complete_all(&mut engine, 0, 2);
    engine.tick(3);
    assert_eq!(engine.mem().issued.len(), 2);
}

#[test]
fn three_reads_end_to_end() {
    let (mut engine, completions) =
        make_engine(config(4), vec![vec![rd(0, 8), rd(64, 8), rd(128, 8)]]);
    assert_eq!(engine.state(), EngineState::Filling);
    assert!(!engine.tick(0));
    assert_eq!(engine.state(), EngineState::Draining);
    assert_eq!(engine.mem().issued.len(), 3);

    assert!(!engine.tick(1));
    assert_eq!(completions.get(), 0);

    for origin in [2, 0, 1] {
        complete_all(&mut engine, origin, 10);
    }
    assert!(engine.tick(11));
    assert_eq!(engine.state(), EngineState::Done);
    assert_eq!(completions.get(), 1);

    assert!(engine.tick(12));
    assert_eq!(completions.get(), 1);
    assert_eq!(engine.stats().read.reqs, 3);
    assert_eq!(engine.stats().latency.count, 3);
    assert_eq!(engine.stats().latency.sum, 30);
}

#[test]
fn issuing_state_while_queue_has_work() {
    let batch = (0..5).map(|i| rd(i * 64, 8)).collect();
    let (mut engine, _) = make_engine(config(2), vec![batch]);
    engine.tick(0);
    assert_eq!(engine.state(), EngineState::Issuing);
}

#[test]
fn empty_generator_finishes_on_first_tick() {
    let engine = IssueEngine::new(
        &CpuConfig::default(),
        Box::new(EmptyGenerator),
        FakeMem::default(),
        Arc::new(Logger::silent()),
    );
    let mut engine = engine.expect("valid config");
    assert!(engine.tick(0));
    assert!(engine.is_done());
    assert!(engine.mem().issued.is_empty());
}

#[test]
fn unknown_completion_is_ignored() {
    let (mut engine, _) = make_engine(config(2), vec![vec![rd(0, 8)]]);
    engine.tick(0);
    assert_eq!(engine.handle_completion(42, 1), None);
    assert_eq!(engine.inflight_requests(), 1);
}

#[test]
fn custom_ids_are_used() {
    let completions = Rc::new(Cell::new(0));
    let gen = ScriptedGen {
        batches: vec![vec![rd(0, 8)]].into(),
        made: Vec::new(),
        completions,
    };
    let mut engine = IssueEngine::with_ids(
        &CpuConfig::default(),
        Box::new(gen),
        FakeMem::default(),
        RequestIdGen::new(500),
        Arc::new(Logger::silent()),
    )
    .expect("valid config");
    engine.tick(0);
    assert_eq!(engine.mem().issued[0].1.origin, 500);
}

#[test]
fn randomized_pagemap_translates_parts() {
    let cfg = CpuConfig {
        pagemap: "RANDOMIZED".to_string(),
        pagecount: 32,
        pagesize: 4096,
        pagemap_seed: 9,
        ..CpuConfig::default()
    };
    let mm = MemoryManager::new(4096, 32, PageMapMode::Randomized, 9).unwrap();
    let (mut engine, _) = make_engine(cfg, vec![vec![rd(4090, 12)]]);
    engine.tick(0);
    let addrs: Vec<u64> = engine.mem().issued.iter().map(|(_, r)| r.addr).collect();
    assert_eq!(addrs, vec![mm.map_address(4090), mm.map_address(4096)]);
}

#[test]
fn bad_configuration_is_fatal() {
    let bad_map = CpuConfig {
        pagemap: "STRIPED".to_string(),
        ..CpuConfig::default()
    };
    assert!(IssueEngine::new(
        &bad_map,
        Box::new(EmptyGenerator),
        FakeMem::default(),
        Arc::new(Logger::silent()),
    )
    .is_err());

    let bad_page = CpuConfig {
        pagesize: 100,
        ..CpuConfig::default()
    };
    assert!(IssueEngine::new(
        &bad_page,
        Box::new(EmptyGenerator),
        FakeMem::default(),
        Arc::new(Logger::silent()),
    )
    .is_err());
}

#[test]
fn next_generator_loads_after_done() {
    let (mut engine, first_done) = make_engine(config(4), vec![vec![rd(0, 8)]]);
    engine.tick(0);
    complete_all(&mut engine, 0, 4);
    assert!(engine.tick(5));
    assert_eq!(engine.stats().time, 5);
    assert_eq!(engine.stats().generators_completed, 1);

    let (second, second_done) = scripted(vec![vec![wr(64, 8), rd(128, 8).after(0)]]);
    engine.load_generator(second).expect("engine is done");
    assert_eq!(engine.state(), EngineState::Filling);

    assert!(!engine.tick(6));
    let origins: Vec<RequestId> = engine.mem().issued.iter().map(|(_, r)| r.origin).collect();
    assert_eq!(origins, vec![0, 1]);
    complete_all(&mut engine, 1, 9);
    engine.tick(10);
    complete_all(&mut engine, 2, 12);
    assert!(engine.tick(13));

    assert_eq!(first_done.get(), 1);
    assert_eq!(second_done.get(), 1);
    assert_eq!(engine.stats().time, 13);
    assert_eq!(engine.stats().generators_completed, 2);
    assert_eq!(engine.stats().total_reqs(), 3);
}

#[test]
fn loading_generator_while_running_fails() {
    let (mut engine, _) = make_engine(config(4), vec![vec![rd(0, 8)]]);
    engine.tick(0);
    let (next, next_done) = scripted(vec![vec![rd(64, 8)]]);
    assert!(engine.load_generator(next).is_err());
    assert_eq!(engine.state(), EngineState::Draining);
    assert_eq!(next_done.get(), 0);
}
