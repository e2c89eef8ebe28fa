//! # Interrupt Queue
//!
//! Chips never push onto a CPU stack. They hand the CPU an
//! [`InterruptRequest`] naming an interrupt line and a reason code, and the CPU
//! serves it before its next fetch when the line is unmasked.
//!
//! Queue rules:
//!
//! - A request for a line that already has a request pending from the same
//!   source is merged into it: the reason bits are OR-ed.
//! - A request for a line whose handler is currently running is queued, not
//!   dropped, and served after (or inside) that handler.
//! - Higher priority lines are served first. Equal priorities are served in
//!   arrival order.
//!
//! Served requests move onto an in-execution stack, popped by the
//! return-from-interrupt instruction.

use std::fmt;

use log::trace;

use crate::chip::ChipId;
use crate::info::InfoStructure;

/// Identifies an interrupt line of a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterruptId(pub u8);

impl InterruptId {
    /// Maskable interrupt.
    pub const IRQ: InterruptId = InterruptId(0);
    /// Non-maskable interrupt.
    pub const NMI: InterruptId = InterruptId(1);
    /// Software interrupt raised by an instruction. Never requested by chips.
    pub const SOFTWARE: InterruptId = InterruptId(0xFF);
}

impl fmt::Display for InterruptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InterruptId::IRQ => write!(f, "IRQ"),
            InterruptId::NMI => write!(f, "NMI"),
            InterruptId::SOFTWARE => write!(f, "BRK"),
            InterruptId(n) => write!(f, "INT{}", n),
        }
    }
}

/// An interrupt line a CPU accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptLine {
    pub id: InterruptId,
    pub name: &'static str,
    /// Higher is served first.
    pub priority: u8,
}

/// A pending request for service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptRequest {
    /// Arrival number, assigned when admitted.
    pub number: u64,
    pub id: InterruptId,
    /// Clock cycle at which the condition arose.
    pub cycles: u64,
    pub source: Option<ChipId>,
    /// Bit mask naming the sub-components that raised it.
    pub reason: u32,
}

impl InterruptRequest {
    pub fn new(id: InterruptId, cycles: u64) -> Self {
        Self {
            number: 0,
            id,
            cycles,
            source: None,
            reason: 0,
        }
    }

    /// Tags the request with the chip that raised it and why.
    pub fn from_chip(mut self, chip: ChipId, reason: u32) -> Self {
        self.source = Some(chip);
        self.reason = reason;
        self
    }
}

/// The per-CPU queue of pending and running interrupts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptSystem {
    lines: Vec<InterruptLine>,
    pending: Vec<InterruptRequest>,
    in_execution: Vec<InterruptRequest>,
    next_number: u64,
}

impl InterruptSystem {
    pub fn new(lines: Vec<InterruptLine>) -> Self {
        Self {
            lines,
            pending: Vec::new(),
            in_execution: Vec::new(),
            next_number: 1,
        }
    }

    /// IRQ and NMI, NMI first.
    pub fn irq_and_nmi() -> Self {
        Self::new(vec![
            InterruptLine {
                id: InterruptId::IRQ,
                name: "IRQ",
                priority: 0,
            },
            InterruptLine {
                id: InterruptId::NMI,
                name: "NMI",
                priority: 1,
            },
        ])
    }

    pub fn lines(&self) -> &[InterruptLine] {
        &self.lines
    }

    /// Admits a request. Returns false for lines this CPU does not have.
    pub fn request(&mut self, mut request: InterruptRequest) -> bool {
        let Some(priority) = self.priority_of(request.id) else {
            trace!("interrupt {} refused: no such line", request.id);
            return false;
        };

        let same = |r: &&mut InterruptRequest| r.id == request.id && r.source == request.source;
        if let Some(existing) = self.pending.iter_mut().find(same) {
            existing.reason |= request.reason;
            trace!(
                "interrupt {} merged into #{} (reason {:#x})",
                request.id,
                existing.number,
                existing.reason
            );
            return true;
        }

        request.number = self.next_number;
        self.next_number += 1;
        let at = self
            .pending
            .iter()
            .position(|r| self.priority_of(r.id).unwrap_or(0) < priority)
            .unwrap_or(self.pending.len());
        trace!(
            "interrupt {} #{} queued at cycle {} (reason {:#x})",
            request.id,
            request.number,
            request.cycles,
            request.reason
        );
        self.pending.insert(at, request);
        true
    }

    /// Drops a pending request raised by `source` on line `id`, if any.
    ///
    /// Chips call this when the condition behind a request went away before
    /// the CPU got to it.
    pub fn withdraw(&mut self, id: InterruptId, source: ChipId) -> bool {
        let before = self.pending.len();
        self.pending
            .retain(|r| !(r.id == id && r.source == Some(source)));
        before != self.pending.len()
    }

    /// The highest priority pending request, if any.
    pub fn peek_pending(&self) -> Option<&InterruptRequest> {
        self.pending.first()
    }

    /// Starts serving the first pending request `servable` accepts.
    pub fn begin_service<F>(&mut self, servable: F) -> Option<InterruptRequest>
    where
        F: Fn(&InterruptRequest) -> bool,
    {
        let at = self.pending.iter().position(servable)?;
        let request = self.pending.remove(at);
        trace!("interrupt {} #{} in execution", request.id, request.number);
        self.in_execution.push(request);
        Some(request)
    }

    /// Records a software interrupt as running, so that its return pops it
    /// instead of an enclosing handler's record.
    pub fn begin_software(&mut self, cycles: u64) -> InterruptRequest {
        let mut request = InterruptRequest::new(InterruptId::SOFTWARE, cycles);
        request.number = self.next_number;
        self.next_number += 1;
        trace!("software interrupt #{} in execution", request.number);
        self.in_execution.push(request);
        request
    }

    /// Marks the innermost running interrupt as finished.
    pub fn end_service(&mut self) -> Option<InterruptRequest> {
        let done = self.in_execution.pop();
        if let Some(r) = &done {
            trace!("interrupt {} #{} returned", r.id, r.number);
        }
        done
    }

    pub fn is_pending(&self, id: InterruptId) -> bool {
        self.pending.iter().any(|r| r.id == id)
    }

    pub fn is_in_execution(&self, id: InterruptId) -> bool {
        self.in_execution.iter().any(|r| r.id == id)
    }

    pub fn pending(&self) -> &[InterruptRequest] {
        &self.pending
    }

    pub fn in_execution(&self) -> &[InterruptRequest] {
        &self.in_execution
    }

    /// Forgets every pending and running interrupt.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_execution.clear();
    }

    pub fn info(&self) -> InfoStructure {
        let describe = |r: &InterruptRequest| {
            format!(
                "{} #{} at {} reason {:#x}{}",
                r.id,
                r.number,
                r.cycles,
                r.reason,
                r.source.map_or(String::new(), |c| format!(" from {}", c))
            )
        };
        let mut info = InfoStructure::new()
            .with("pending", self.pending.len())
            .with("in execution", self.in_execution.len());
        for (i, r) in self.pending.iter().enumerate() {
            info.add(format!("pending {}", i), describe(r));
        }
        for (i, r) in self.in_execution.iter().enumerate() {
            info.add(format!("running {}", i), describe(r));
        }
        info
    }

    fn priority_of(&self, id: InterruptId) -> Option<u8> {
        self.lines.iter().find(|l| l.id == id).map(|l| l.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_software_interrupt_nests_inside_handler() {
        let mut ints = InterruptSystem::irq_and_nmi();
        ints.request(InterruptRequest::new(InterruptId::IRQ, 10));
        ints.begin_service(|_| true).unwrap();
        ints.begin_software(20);

        assert_eq!(ints.end_service().map(|r| r.id), Some(InterruptId::SOFTWARE));
        assert!(ints.is_in_execution(InterruptId::IRQ));
        assert_eq!(ints.end_service().map(|r| r.id), Some(InterruptId::IRQ));
    }

    #[test]
    fn test_nmi_served_before_irq() {
        let mut ints = InterruptSystem::irq_and_nmi();
        ints.request(InterruptRequest::new(InterruptId::IRQ, 10));
        ints.request(InterruptRequest::new(InterruptId::NMI, 12));
        assert_eq!(ints.peek_pending().map(|r| r.id), Some(InterruptId::NMI));
    }

    #[test]
    fn test_pending_requests_merge_reasons() {
        let mut ints = InterruptSystem::irq_and_nmi();
        ints.request(InterruptRequest::new(InterruptId::IRQ, 1).from_chip(ChipId(0), 0x01));
        ints.request(InterruptRequest::new(InterruptId::IRQ, 2).from_chip(ChipId(0), 0x04));
        assert_eq!(ints.pending().len(), 1);
        assert_eq!(ints.pending()[0].reason, 0x05);
    }

    #[test]
    fn test_request_during_execution_is_queued() {
        let mut ints = InterruptSystem::irq_and_nmi();
        ints.request(InterruptRequest::new(InterruptId::NMI, 1));
        let served = ints.begin_service(|_| true).unwrap();
        assert_eq!(served.number, 1);
        ints.request(InterruptRequest::new(InterruptId::NMI, 5));
        assert!(ints.is_in_execution(InterruptId::NMI));
        assert!(ints.is_pending(InterruptId::NMI));
        assert_eq!(ints.end_service().map(|r| r.number), Some(1));
    }

    #[test]
    fn test_unknown_line_refused() {
        let mut ints = InterruptSystem::irq_and_nmi();
        assert!(!ints.request(InterruptRequest::new(InterruptId(7), 0)));
    }

    #[test]
    fn test_withdraw_only_matching_source() {
        let mut ints = InterruptSystem::irq_and_nmi();
        ints.request(InterruptRequest::new(InterruptId::IRQ, 1).from_chip(ChipId(2), 1));
        assert!(!ints.withdraw(InterruptId::IRQ, ChipId(3)));
        assert!(ints.withdraw(InterruptId::IRQ, ChipId(2)));
        assert!(ints.pending().is_empty());
    }
}
