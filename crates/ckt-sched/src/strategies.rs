//! The five topological-sort strategies named in spec §4.1, each a free
//! function over `&Dag` returning a `Vec<GateId>` (recomputed from
//! scratch on every call — per spec §9, scheduling state is never valid
//! across two sort invocations, so none of it is cached on the `Dag`).

use ckt::dag::{Dag, GateFunc};
use ckt::ir::Sym;
use std::collections::HashMap;

/// Selects one of the five scheduling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopoSortStrategy {
    /// Kahn's algorithm with a two-queue discipline and a tie-break that
    /// prefers unlocking multi-output successors.
    PriorityKahn,
    /// The canonical topological order, with source-only gates
    /// repositioned to immediately before their first use.
    SourceInsertion,
    /// As-Late-As-Possible scheduling with slack as a tie-break.
    Alap,
    /// ALAP-informed list scheduling that prefers retiring the most live
    /// predecessors.
    RegisterPressureList,
    /// [`TopoSortStrategy::RegisterPressureList`], additionally forcing
    /// every input port to appear immediately before its first internal
    /// consumer.
    RegisterPressureListPortsFirst,
}

/// Dispatches to the chosen strategy.
pub fn topo_sort(dag: &Dag, strategy: TopoSortStrategy) -> Vec<Sym> {
    match strategy {
        TopoSortStrategy::PriorityKahn => priority_kahn(dag),
        TopoSortStrategy::SourceInsertion => source_insertion(dag),
        TopoSortStrategy::Alap => alap(dag).0,
        TopoSortStrategy::RegisterPressureList => register_pressure_list(dag),
        TopoSortStrategy::RegisterPressureListPortsFirst => {
            reposition_before_first_use(dag, &register_pressure_list(dag), |dag, id| dag.is_in_port(id))
        }
    }
}

/// Kahn's algorithm with a source/internal ready-queue split: internal
/// (already-produced) values are drained before new sources are pulled
/// in, and ties are broken by how many further gates a pick immediately
/// unlocks, weighted toward unlocking multi-output successors.
pub fn priority_kahn(dag: &Dag) -> Vec<Sym> {
    let mut in_degree: HashMap<Sym, usize> =
        dag.gate_ids().map(|id| (id.clone(), dag.in_degree(id))).collect();
    let mut source_ready: Vec<Sym> = Vec::new();
    let mut internal_ready: Vec<Sym> = Vec::new();

    for id in dag.gate_ids() {
        if in_degree[id] == 0 {
            bucket(dag, id, &mut source_ready, &mut internal_ready);
        }
    }

    let mut order = Vec::with_capacity(in_degree.len());
    while !source_ready.is_empty() || !internal_ready.is_empty() {
        let queue = if !internal_ready.is_empty() { &mut internal_ready } else { &mut source_ready };
        let idx = best_by_unlock_score(dag, queue);
        let id = queue.remove(idx);

        for succ in dag.successors(&id) {
            if let Some(d) = in_degree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    bucket(dag, succ, &mut source_ready, &mut internal_ready);
                }
            }
        }
        order.push(id);
    }
    order
}

fn bucket(dag: &Dag, id: &Sym, source_ready: &mut Vec<Sym>, internal_ready: &mut Vec<Sym>) {
    let is_source = dag.gate(id).is_some_and(|g| {
        matches!(g.gate_func, GateFunc::InPort | GateFunc::Zero | GateFunc::One)
    });
    if is_source {
        source_ready.push(id.clone());
    } else {
        internal_ready.push(id.clone());
    }
}

fn unlock_score(dag: &Dag, id: &Sym, in_degree: &HashMap<Sym, usize>) -> usize {
    dag.successors(id)
        .iter()
        .map(|succ| {
            let about_to_unlock = in_degree.get(succ).copied() == Some(1);
            let multi_output_bonus = dag.gate(succ).is_some_and(|g| g.outputs.len() > 1);
            usize::from(about_to_unlock) + usize::from(about_to_unlock && multi_output_bonus)
        })
        .sum()
}

/// Picks the index in `ready` with the highest unlock score, breaking
/// ties by id for determinism. Recomputes in-degree locally since the
/// caller's map is borrowed elsewhere; cheap at this scale.
fn best_by_unlock_score(dag: &Dag, ready: &[Sym]) -> usize {
    let in_degree: HashMap<Sym, usize> =
        dag.gate_ids().map(|id| (id.clone(), dag.in_degree(id))).collect();
    ready
        .iter()
        .enumerate()
        .max_by_key(|(_, id)| (unlock_score(dag, id, &in_degree), std::cmp::Reverse((*id).clone())))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// The canonical topological order with source-only gates (zero
/// in-degree non-port gates, and `copy` gates reading directly from an
/// input port) moved to immediately before their first use.
pub fn source_insertion(dag: &Dag) -> Vec<Sym> {
    let base = dag.topo_order();
    reposition_before_first_use(dag, &base, |dag, id| {
        let Some(g) = dag.gate(id) else { return false };
        let zero_degree_non_port = dag.in_degree(id) == 0 && g.gate_func != GateFunc::InPort;
        let port_copy = g.gate_func == GateFunc::Copy
            && dag.predecessors(id).iter().any(|p| dag.is_in_port(p));
        zero_degree_non_port || port_copy
    })
}

/// Moves every gate matching `is_source` to sit immediately before the
/// earliest-scheduled of its successors, preserving the relative order
/// of both groups otherwise.
fn reposition_before_first_use(
    dag: &Dag,
    base_order: &[Sym],
    is_source: impl Fn(&Dag, &Sym) -> bool,
) -> Vec<Sym> {
    let rest: Vec<Sym> = base_order.iter().filter(|id| !is_source(dag, id)).cloned().collect();
    let rest_pos: HashMap<Sym, usize> =
        rest.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
    let sources: Vec<Sym> = base_order.iter().filter(|id| is_source(dag, id)).cloned().collect();

    let mut insert_at: Vec<(usize, Sym)> = sources
        .into_iter()
        .map(|src| {
            let min_pos = dag.successors(&src).iter().filter_map(|s| rest_pos.get(s)).min().copied();
            (min_pos.unwrap_or(rest.len()), src)
        })
        .collect();
    insert_at.sort_by_key(|(pos, _)| *pos);

    let mut result = Vec::with_capacity(base_order.len());
    let mut src_iter = insert_at.into_iter().peekable();
    for i in 0..=rest.len() {
        while let Some((pos, _)) = src_iter.peek() {
            if *pos != i {
                break;
            }
            let (_, id) = src_iter.next().unwrap();
            result.push(id);
        }
        if i < rest.len() {
            result.push(rest[i].clone());
        }
    }
    result
}

/// ASAP/ALAP levels and the resulting order: at each ready-queue step,
/// picks the gate with the smallest ALAP value (least schedule slack),
/// breaking ties by slack then by id.
pub fn alap(dag: &Dag) -> (Vec<Sym>, HashMap<Sym, i64>) {
    let asap = compute_asap(dag);
    let makespan = asap.values().copied().max().unwrap_or(0);
    let alap_levels = compute_alap(dag, makespan);

    let mut in_degree: HashMap<Sym, usize> =
        dag.gate_ids().map(|id| (id.clone(), dag.in_degree(id))).collect();
    let mut ready: Vec<Sym> = dag.gate_ids().filter(|id| in_degree[*id] == 0).cloned().collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while !ready.is_empty() {
        let idx = ready
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| {
                let al = alap_levels[*id];
                let slack = al - asap[*id];
                (al, slack, (*id).clone())
            })
            .map(|(idx, _)| idx)
            .unwrap();
        let id = ready.remove(idx);
        for succ in dag.successors(&id) {
            if let Some(d) = in_degree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    ready.push(succ.clone());
                }
            }
        }
        order.push(id);
    }
    (order, alap_levels)
}

fn compute_asap(dag: &Dag) -> HashMap<Sym, i64> {
    let mut levels = HashMap::new();
    for id in dag.topo_order() {
        let level = dag
            .predecessors(&id)
            .iter()
            .map(|p| levels.get(p).copied().unwrap_or(0))
            .max()
            .map(|m: i64| m + 1)
            .unwrap_or(0);
        levels.insert(id, level);
    }
    levels
}

fn compute_alap(dag: &Dag, makespan: i64) -> HashMap<Sym, i64> {
    let mut levels = HashMap::new();
    for id in dag.topo_order().into_iter().rev() {
        let level = dag
            .successors(&id)
            .iter()
            .map(|s| levels.get(s).copied().unwrap_or(makespan + 1))
            .min()
            .map(|m: i64| m - 1)
            .unwrap_or(makespan);
        levels.insert(id, level);
    }
    levels
}

/// ALAP-informed list scheduling whose cost function prefers gates that
/// retire (make fully consumed) as many live predecessors as possible.
pub fn register_pressure_list(dag: &Dag) -> Vec<Sym> {
    let (_, alap_levels) = alap(dag);
    let mut remaining_uses: HashMap<Sym, usize> =
        dag.gate_ids().map(|id| (id.clone(), dag.successors(id).len())).collect();
    let mut in_degree: HashMap<Sym, usize> =
        dag.gate_ids().map(|id| (id.clone(), dag.in_degree(id))).collect();
    let mut ready: Vec<Sym> = dag.gate_ids().filter(|id| in_degree[*id] == 0).cloned().collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while !ready.is_empty() {
        let idx = ready
            .iter()
            .enumerate()
            .max_by_key(|(_, id)| {
                let retires = dag
                    .predecessors(id)
                    .iter()
                    .filter(|p| remaining_uses.get(*p).copied() == Some(1))
                    .count();
                let urgency = std::cmp::Reverse(alap_levels.get(*id).copied().unwrap_or(0));
                (retires, urgency, std::cmp::Reverse((*id).clone()))
            })
            .map(|(idx, _)| idx)
            .unwrap();
        let id = ready.remove(idx);

        for succ in dag.successors(&id) {
            if let Some(d) = in_degree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    ready.push(succ.clone());
                }
            }
        }
        for pred in dag.predecessors(&id) {
            if let Some(c) = remaining_uses.get_mut(pred) {
                *c = c.saturating_sub(1);
            }
        }
        order.push(id);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckt::dag::GateInfo;
    use ckt::debug::DebugLevel;

    fn half_adder() -> Dag {
        Dag::new(
            "half_adder",
            vec![Sym::new("a"), Sym::new("b")],
            vec![Sym::new("sum"), Sym::new("cout")],
            vec![
                GateInfo {
                    gate_id: Sym::new("g0"),
                    gate_func: GateFunc::Xor2,
                    inputs: vec![Sym::new("a"), Sym::new("b")],
                    outputs: vec![Sym::new("sum")],
                },
                GateInfo {
                    gate_id: Sym::new("g1"),
                    gate_func: GateFunc::And2,
                    inputs: vec![Sym::new("a"), Sym::new("b")],
                    outputs: vec![Sym::new("cout")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap()
    }

    fn is_valid_topo_order(dag: &Dag, order: &[Sym]) -> bool {
        let mut scheduled = std::collections::HashSet::new();
        for id in order {
            for pred in dag.predecessors(id) {
                if !scheduled.contains(pred) {
                    return false;
                }
            }
            scheduled.insert(id.clone());
        }
        scheduled.len() == dag.num_gates()
    }

    #[test]
    fn all_five_strategies_produce_valid_topological_orders() {
        let dag = half_adder();
        for strategy in [
            TopoSortStrategy::PriorityKahn,
            TopoSortStrategy::SourceInsertion,
            TopoSortStrategy::Alap,
            TopoSortStrategy::RegisterPressureList,
            TopoSortStrategy::RegisterPressureListPortsFirst,
        ] {
            let order = topo_sort(&dag, strategy);
            assert!(is_valid_topo_order(&dag, &order), "{strategy:?} produced an invalid order");
        }
    }

    #[test]
    fn ports_first_variant_schedules_every_port_immediately_before_its_first_consumer() {
        // Two inputs, each with its own distinct single consumer, so there
        // is no ambiguity about which gate "first use" refers to.
        let dag = Dag::new(
            "two_independent_copies",
            vec![Sym::new("a"), Sym::new("b")],
            vec![Sym::new("x"), Sym::new("y")],
            vec![
                GateInfo {
                    gate_id: Sym::new("copy_a"),
                    gate_func: GateFunc::Copy,
                    inputs: vec![Sym::new("a")],
                    outputs: vec![Sym::new("x")],
                },
                GateInfo {
                    gate_id: Sym::new("copy_b"),
                    gate_func: GateFunc::Copy,
                    inputs: vec![Sym::new("b")],
                    outputs: vec![Sym::new("y")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let order = topo_sort(&dag, TopoSortStrategy::RegisterPressureListPortsFirst);
        let pos: HashMap<Sym, usize> = order.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        for port in dag.in_ports() {
            let port_pos = pos[port];
            for consumer in dag.successors(port) {
                assert!(port_pos < pos[consumer], "port {port} should precede its consumer {consumer}");
            }
            let next = &order[port_pos + 1];
            assert!(
                dag.successors(port).contains(next),
                "nothing should be scheduled between port {port} and its first consumer"
            );
        }
    }

    #[test]
    fn source_insertion_moves_constants_next_to_their_use() {
        // maj3(a,b,zero): the zero-constant gate should end up immediately
        // before the maj3 gate rather than wherever plain topo_order put it.
        let dag = Dag::new(
            "with_const",
            vec![Sym::new("a"), Sym::new("b")],
            vec![Sym::new("m")],
            vec![
                GateInfo {
                    gate_id: Sym::new("zero_g"),
                    gate_func: GateFunc::Zero,
                    inputs: vec![],
                    outputs: vec![Sym::new("z")],
                },
                GateInfo {
                    gate_id: Sym::new("maj_g"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("a"), Sym::new("b"), Sym::new("z")],
                    outputs: vec![Sym::new("m")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let order = source_insertion(&dag);
        let zero_pos = order.iter().position(|id| id.as_str() == "zero_g").unwrap();
        let maj_pos = order.iter().position(|id| id.as_str() == "maj_g").unwrap();
        assert_eq!(zero_pos + 1, maj_pos);
    }
}
