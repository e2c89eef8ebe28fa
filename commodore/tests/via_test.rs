//! VIA tests through the register window of a running machine.

use std::cell::RefCell;
use std::rc::Rc;

use commodore::via::{
    EVENT_CA1, EVENT_CA2, EVENT_CB2, EVENT_PORT_A, EVENT_PORT_A_INPUT, EVENT_PORT_B_INPUT, IFR_CA1,
    IFR_SR, IFR_T1, IFR_T2,
};
use commodore::Via;
use lib8bit::{
    Chip, ChipId, Computer, Event, InterruptId, Memory, MemoryBus, MemoryView, Mos6502,
    PhysicalStorage, PhysicalStorageSubset, SubsetId, ViewId,
};

const VIA: ChipId = ChipId(3);
const BASE: u16 = 0x9110;

/// NOP-filled RAM around a VIA register window at $9110-$911F.
fn setup_memory() -> Memory {
    let mut image = vec![0xEA; 0x10000];
    image[0xFFFC] = 0x00;
    image[0xFFFD] = 0x80;

    let mut memory = Memory::new();
    let ram = memory.add_storage(PhysicalStorage::ram("RAM", 0x10000));
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(0), "low", ram, 0, 0x0000, 0x9110)
                .with_default_data(image[..0x9110].to_vec()),
        )
        .unwrap();
    memory
        .add_subset(PhysicalStorageSubset::registers(SubsetId(1), "VIA", BASE, 0x10))
        .unwrap();
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(2), "high", ram, 0x9120, 0x9120, 0x6EE0)
                .with_default_data(image[0x9120..].to_vec()),
        )
        .unwrap();
    memory
        .add_view(MemoryView::new(
            ViewId(0),
            "cpu",
            vec![SubsetId(0), SubsetId(1), SubsetId(2)],
        ))
        .unwrap();
    memory
}

fn setup_computer() -> Computer {
    let mut computer = Computer::new(Box::new(Mos6502::new()), setup_memory());
    computer.add_chip(Box::new(Via::new(VIA, "VIA1", SubsetId(1), InterruptId::IRQ)));
    computer.initialize().unwrap();
    computer
}

fn write(computer: &mut Computer, register: u16, value: u8) {
    computer.bus().write(BASE + register, value);
}

fn peek(computer: &mut Computer, register: u16) -> u8 {
    computer.bus().peek(BASE + register)
}

fn via(computer: &Computer) -> &Via {
    computer.chip::<Via>(VIA).unwrap()
}

fn push(computer: &mut Computer, event: Event) {
    computer.chip_mut::<Via>(VIA).unwrap().push_event(event);
}

/// Records the values of one event id published by the VIA.
fn record(computer: &Computer, id: u32) -> (Rc<RefCell<Vec<i64>>>, lib8bit::Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let subscription = via(computer).notifier().unwrap().subscribe(move |event| {
        if event.id == id {
            sink.borrow_mut().push(event.value);
        }
    });
    (seen, subscription)
}

#[test]
fn test_timer1_one_shot_interrupt() {
    let mut computer = setup_computer();
    write(&mut computer, 0x0E, 0x80 | IFR_T1);
    write(&mut computer, 0x04, 0x10);
    write(&mut computer, 0x05, 0x00);
    computer.run_for_cycles(20).unwrap();

    assert_eq!(peek(&mut computer, 0x0D), 0x80 | IFR_T1);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));
    assert!(!via(&computer).timer1().is_counting());

    // Reading T1 low acknowledges
    computer.bus().read(BASE + 0x04);
    assert_eq!(peek(&mut computer, 0x0D), 0x00);
    computer.step().unwrap();
    assert!(!computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_timer1_free_running_toggles_pb7() {
    let mut computer = setup_computer();
    write(&mut computer, 0x0B, 0xC0);
    write(&mut computer, 0x04, 0x04);
    write(&mut computer, 0x05, 0x00);
    assert_eq!(peek(&mut computer, 0x00) & 0x80, 0x00);

    computer.run_for_cycles(4).unwrap();
    assert_eq!(peek(&mut computer, 0x00) & 0x80, 0x80);
    computer.run_for_cycles(4).unwrap();
    assert_eq!(peek(&mut computer, 0x00) & 0x80, 0x00);
    assert!(via(&computer).timer1().is_counting());
}

#[test]
fn test_timer1_latch_readback() {
    let mut computer = setup_computer();
    write(&mut computer, 0x06, 0x34);
    write(&mut computer, 0x07, 0x12);
    assert_eq!(peek(&mut computer, 0x06), 0x34);
    assert_eq!(peek(&mut computer, 0x07), 0x12);
    assert!(!via(&computer).timer1().is_counting());
}

#[test]
fn test_timer2_counts_pb6_pulses() {
    let mut computer = setup_computer();
    write(&mut computer, 0x0B, 0x20);
    write(&mut computer, 0x08, 0x02);
    write(&mut computer, 0x09, 0x00);

    push(&mut computer, Event::with_value(EVENT_PORT_B_INPUT, 0xBF));
    computer.step().unwrap();
    assert_eq!(via(&computer).timer2().current_value(), 1);

    // Rising edges do not count
    push(&mut computer, Event::with_value(EVENT_PORT_B_INPUT, 0xFF));
    computer.step().unwrap();
    assert_eq!(via(&computer).timer2().current_value(), 1);

    push(&mut computer, Event::with_value(EVENT_PORT_B_INPUT, 0xBF));
    computer.step().unwrap();
    assert_eq!(peek(&mut computer, 0x0D) & IFR_T2, IFR_T2);
}

#[test]
fn test_ca1_edge_interrupt_cleared_by_port_a_read() {
    let mut computer = setup_computer();
    write(&mut computer, 0x0E, 0x80 | IFR_CA1);
    push(&mut computer, Event::with_value(EVENT_CA1, 0));
    computer.step().unwrap();

    assert_eq!(peek(&mut computer, 0x0D), 0x80 | IFR_CA1);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));

    computer.bus().read(BASE + 0x01);
    assert_eq!(peek(&mut computer, 0x0D), 0x00);
}

#[test]
fn test_port_a_input_latched_on_ca1() {
    let mut computer = setup_computer();
    write(&mut computer, 0x0B, 0x01);
    push(&mut computer, Event::with_value(EVENT_PORT_A_INPUT, 0x5A));
    push(&mut computer, Event::with_value(EVENT_CA1, 0));
    push(&mut computer, Event::with_value(EVENT_PORT_A_INPUT, 0x00));
    computer.step().unwrap();

    assert_eq!(peek(&mut computer, 0x01), 0x5A);

    // Without latching the live pins show through
    write(&mut computer, 0x0B, 0x00);
    assert_eq!(peek(&mut computer, 0x01), 0x00);
}

#[test]
fn test_ca2_handshake_output() {
    let mut computer = setup_computer();
    let (seen, _subscription) = record(&computer, EVENT_CA2);
    write(&mut computer, 0x0C, 0x08);

    write(&mut computer, 0x01, 0x00);
    assert!(!via(&computer).ca2().level());

    push(&mut computer, Event::with_value(EVENT_CA1, 0));
    computer.step().unwrap();
    assert!(via(&computer).ca2().level());
    assert_eq!(*seen.borrow(), vec![0, 1]);
}

#[test]
fn test_cb2_pulse_output() {
    let mut computer = setup_computer();
    let (seen, _subscription) = record(&computer, EVENT_CB2);
    write(&mut computer, 0x0C, 0xA0);
    assert_eq!(peek(&mut computer, 0x0C), 0xA0);

    write(&mut computer, 0x00, 0x55);
    assert_eq!(*seen.borrow(), vec![0]);
    computer.step().unwrap();
    assert_eq!(*seen.borrow(), vec![0, 1]);
}

#[test]
fn test_shift_register_out_at_clock_rate() {
    let mut computer = setup_computer();
    let (seen, _subscription) = record(&computer, EVENT_CB2);
    write(&mut computer, 0x0B, 0x18);
    write(&mut computer, 0x0E, 0x80 | IFR_SR);
    write(&mut computer, 0x0A, 0xA0);
    computer.run_for_cycles(10).unwrap();

    assert_eq!(*seen.borrow(), vec![1, 0, 1, 0, 0, 0, 0, 0]);
    assert_eq!(peek(&mut computer, 0x0D), 0x80 | IFR_SR);
    assert!(!via(&computer).shift_register().is_shifting());
}

#[test]
fn test_shift_register_out_under_timer2() {
    let mut computer = setup_computer();
    let (seen, _subscription) = record(&computer, EVENT_CB2);
    write(&mut computer, 0x0B, 0x14);
    write(&mut computer, 0x08, 0x04);
    write(&mut computer, 0x09, 0x00);
    write(&mut computer, 0x0A, 0xA0);

    // A bit each time the T2 low byte reaches zero
    computer.run_for_cycles(12).unwrap();
    assert_eq!(*seen.borrow(), vec![1, 0, 1]);
    assert!(via(&computer).timer2().is_counting());

    computer.run_for_cycles(24).unwrap();
    assert_eq!(*seen.borrow(), vec![1, 0, 1, 0, 0, 0, 0, 0]);
    assert_eq!(peek(&mut computer, 0x0D) & IFR_SR, IFR_SR);
    assert!(!via(&computer).shift_register().is_shifting());
}

#[test]
fn test_ier_set_and_clear() {
    let mut computer = setup_computer();
    assert_eq!(peek(&mut computer, 0x0E), 0x80);
    write(&mut computer, 0x0E, 0x80 | IFR_T1 | IFR_CA1);
    assert_eq!(peek(&mut computer, 0x0E), 0x80 | IFR_T1 | IFR_CA1);
    write(&mut computer, 0x0E, IFR_CA1);
    assert_eq!(peek(&mut computer, 0x0E), 0x80 | IFR_T1);
}

#[test]
fn test_port_a_output_notifies_pins() {
    let mut computer = setup_computer();
    let (seen, _subscription) = record(&computer, EVENT_PORT_A);
    write(&mut computer, 0x03, 0xFF);
    write(&mut computer, 0x0F, 0x12);
    assert_eq!(*seen.borrow(), vec![0x00, 0x12]);
    assert_eq!(via(&computer).port_a().value(), 0x12);
}
