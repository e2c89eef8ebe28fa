//! Tests for the countdown timer state machine.

use lib8bit::{CountMode, LatchedFlag, RunMode, Timer, TimerFlag};
use proptest::prelude::*;

fn setup_timer(run_mode: RunMode, value: u16) -> Timer {
    let mut timer = Timer::new(0, run_mode, CountMode::Cycles);
    timer.load(value);
    timer.start();
    timer
}

#[test]
fn test_power_on_state() {
    let timer = Timer::new(3, RunMode::OneShot, CountMode::Cycles);
    assert_eq!(timer.id(), 3);
    assert_eq!(timer.initial_value(), 0xFFFF);
    assert_eq!(timer.current_value(), 0xFFFF);
    assert!(!timer.is_counting());
}

#[test]
fn test_idle_timer_ignores_ticks() {
    let mut timer = Timer::new(0, RunMode::Reload, CountMode::Cycles);
    timer.load(2);
    for _ in 0..10 {
        assert!(!timer.clock(true));
    }
    assert_eq!(timer.current_value(), 2);
}

#[test]
fn test_pulse_mode_counts_only_pulses() {
    let mut timer = Timer::new(0, RunMode::OneShot, CountMode::Pulses);
    timer.load(2);
    timer.start();
    assert!(!timer.clock(false));
    assert!(!timer.clock(true));
    assert!(!timer.clock(false));
    assert!(timer.clock(true));
    assert!(!timer.is_counting());
}

#[test]
fn test_continuous_wraps_through_ffff() {
    let mut timer = setup_timer(RunMode::Continuous, 1);
    assert!(timer.clock(false));
    assert_eq!(timer.current_value(), 0);
    timer.clock(false);
    assert_eq!(timer.current_value(), 0xFFFF);
    assert!(timer.is_counting());
}

#[test]
fn test_edge_flags_last_one_tick() {
    let mut timer = setup_timer(RunMode::Reload, 0x0104);
    for _ in 0..4 {
        timer.clock(false);
    }
    assert_eq!(timer.current_value(), 0x0100);
    assert!(timer.reaches_zero_low_byte());
    timer.clock(false);
    assert!(!timer.reaches_zero_low_byte());
}

#[test]
fn test_reaches_half_once_per_period() {
    let mut timer = setup_timer(RunMode::Reload, 10);
    let halves: Vec<u16> = (1..=20)
        .filter(|_| {
            timer.clock(false);
            timer.reaches_half()
        })
        .collect();
    assert_eq!(halves, vec![5, 15]);
}

#[test]
fn test_interrupt_request_latches_until_read() {
    let mut timer = setup_timer(RunMode::Reload, 1);
    timer.clock(false);
    timer.clock(false);

    assert!(timer.interrupt_requested());
    assert!(!timer.launch_interrupt());
    timer.set_interrupt_enabled(true);
    assert!(timer.launch_interrupt());

    assert!(timer.take_interrupt_request());
    assert!(!timer.take_interrupt_request());
    assert!(!timer.launch_interrupt());
}

#[test]
fn test_initialize_restores_power_on_modes() {
    let mut timer = setup_timer(RunMode::OneShot, 5);
    timer.set_run_mode(RunMode::Continuous);
    timer.set_count_mode(CountMode::Pulses);
    timer.flag_mut(TimerFlag::InterruptRequested).set();

    timer.initialize();
    assert_eq!(timer.run_mode(), RunMode::OneShot);
    assert_eq!(timer.count_mode(), CountMode::Cycles);
    assert!(!timer.flag(TimerFlag::InterruptRequested).peek());
    assert_eq!(timer.current_value(), 0xFFFF);
}

#[test]
fn test_latched_flag_read_and_peek() {
    let mut flag = LatchedFlag::default();
    flag.set();
    assert!(flag.peek());
    assert!(flag.peek());
    assert!(flag.read());
    assert!(!flag.read());
    assert!(!flag.peek());
}

proptest! {
    #[test]
    fn prop_one_shot_fires_exactly_once(n in 1u16..600, extra in 1usize..600) {
        let mut timer = setup_timer(RunMode::OneShot, n);
        for tick in 1..=n {
            let fired = timer.clock(false);
            prop_assert_eq!(fired, tick == n);
            prop_assert_eq!(timer.reaches_zero(), tick == n);
        }
        prop_assert!(!timer.is_counting());
        prop_assert_eq!(timer.current_value(), n);
        for _ in 0..extra {
            prop_assert!(!timer.clock(false));
            prop_assert!(!timer.reaches_zero());
        }

        timer.start();
        for _ in 1..n {
            prop_assert!(!timer.clock(false));
        }
        prop_assert!(timer.clock(false));
    }

    #[test]
    fn prop_reload_recurs_every_n_ticks(n in 1u16..300, periods in 1u32..6) {
        let mut timer = setup_timer(RunMode::Reload, n);
        let total = n as u32 * periods;
        for tick in 1..=total {
            let fired = timer.clock(false);
            prop_assert_eq!(fired, tick % n as u32 == 0);
        }
        prop_assert!(timer.is_counting());
        prop_assert_eq!(timer.current_value(), n);
    }
}
