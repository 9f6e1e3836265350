//! Gate representation: the node type of the typed gate/wire graph.

use crate::ir::Sym;
use std::collections::BTreeSet;

/// A gate's function, drawn from a closed enumeration.
///
/// Kept as a tagged union (not a free-form string): this makes the
/// transformation catalog pattern-matchable and eliminates the class of
/// bug where a missing attribute is silently treated as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateFunc {
    /// Primary input port. Its sole output wire is named after the port.
    InPort,
    /// Primary output port. Its sole input wire is named after the port.
    OutPort,
    /// Non-destructive row-to-row copy.
    Copy,
    /// Analog in-out copy: refreshes the anchor consumer while also
    /// producing a fresh copy for a second input-destroying consumer.
    CopyInout,
    /// One's complement.
    Inv1,
    /// Two-input AND.
    And2,
    /// Two-input OR.
    Or2,
    /// Two-input NAND.
    Nand2,
    /// Two-input NOR.
    Nor2,
    /// Two-input XOR.
    Xor2,
    /// Two-input XNOR.
    Xnor2,
    /// Two-input multiplexer; input order is significant: selector first,
    /// then the `sel=0` branch, then the `sel=1` branch.
    Mux2,
    /// Three-input majority.
    Maj3,
    /// Constant-`0` source.
    Zero,
    /// Constant-`1` source.
    One,
}

impl GateFunc {
    /// True for gates whose analog implementation overwrites (destroys)
    /// its input rows: `and2`, `or2`, `maj3` (the "input-destroying gate"
    /// of the glossary).
    pub fn is_input_destroying(self) -> bool {
        matches!(self, GateFunc::And2 | GateFunc::Or2 | GateFunc::Maj3)
    }

    /// True for the two port gate kinds.
    pub fn is_port(self) -> bool {
        matches!(self, GateFunc::InPort | GateFunc::OutPort)
    }

    /// The BLIF `.gate` function keyword for this gate function, if any
    /// (ports and constants are never spelled this way in BLIF).
    pub fn blif_keyword(self) -> Option<&'static str> {
        match self {
            GateFunc::Inv1 => Some("inv1"),
            GateFunc::And2 => Some("and2"),
            GateFunc::Or2 => Some("or2"),
            GateFunc::Nand2 => Some("nand2"),
            GateFunc::Nor2 => Some("nor2"),
            GateFunc::Xor2 => Some("xor2"),
            GateFunc::Xnor2 => Some("xnor2"),
            GateFunc::Mux2 => Some("mux2"),
            GateFunc::Maj3 => Some("maj3"),
            GateFunc::Copy => Some("copy"),
            GateFunc::CopyInout => Some("copy_inout"),
            GateFunc::Zero => Some("zero"),
            GateFunc::One => Some("one"),
            GateFunc::InPort | GateFunc::OutPort => None,
        }
    }

    /// Evaluates the gate's truth table given already-inverted input
    /// values (inversion is applied by the caller per the `inverted` set
    /// before this is called). Used by the symbolic verifier.
    pub fn eval(self, inputs: &[bool]) -> bool {
        match self {
            GateFunc::Inv1 => !inputs[0],
            GateFunc::And2 => inputs[0] && inputs[1],
            GateFunc::Or2 => inputs[0] || inputs[1],
            GateFunc::Nand2 => !(inputs[0] && inputs[1]),
            GateFunc::Nor2 => !(inputs[0] || inputs[1]),
            GateFunc::Xor2 => inputs[0] ^ inputs[1],
            GateFunc::Xnor2 => !(inputs[0] ^ inputs[1]),
            GateFunc::Mux2 => {
                if inputs[0] {
                    inputs[2]
                } else {
                    inputs[1]
                }
            }
            GateFunc::Maj3 => {
                (inputs[0] && inputs[1]) || (inputs[0] && inputs[2]) || (inputs[1] && inputs[2])
            }
            GateFunc::Copy | GateFunc::CopyInout => inputs[0],
            GateFunc::Zero => false,
            GateFunc::One => true,
            GateFunc::InPort | GateFunc::OutPort => {
                unreachable!("port gates are not evaluated directly")
            }
        }
    }
}

/// A node in the DAG: a gate or a port, with ordered input/output wires
/// and the set of inputs consumed complemented.
#[derive(Debug, Clone)]
pub struct Gate {
    /// Globally unique id within the owning DAG. For port gates, this
    /// equals the port name.
    pub gate_id: Sym,
    /// The gate's function.
    pub gate_func: GateFunc,
    /// Ordered input wire names — order is semantically significant for
    /// `mux2` and for assembly operand positions.
    pub inputs: Vec<Sym>,
    /// Ordered output wire names (more than one only for analog
    /// multi-destination `maj3` packing).
    pub outputs: Vec<Sym>,
    /// Subset of `inputs` consumed complemented (analog dual-contact).
    /// Always empty for port gates.
    pub inverted: BTreeSet<Sym>,
}

impl Gate {
    /// Builds a gate with no inverted inputs.
    pub fn new(gate_id: Sym, gate_func: GateFunc, inputs: Vec<Sym>, outputs: Vec<Sym>) -> Self {
        Gate {
            gate_id,
            gate_func,
            inputs,
            outputs,
            inverted: BTreeSet::new(),
        }
    }

    /// True iff `wire` is consumed inverted by this gate.
    pub fn is_inverted(&self, wire: &Sym) -> bool {
        self.inverted.contains(wire)
    }
}
