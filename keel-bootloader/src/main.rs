// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

#![no_std]
#![no_main]

mod inspect;
mod jump;

use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;
use keel_common::boot::{plan_boot, BootAction};
use keel_common::store;
use keel_common::xip::{FlashGate, XipFlash};
use rp2040_hal::{self as hal, pac};

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

const XTAL_FREQ_HZ: u32 = 12_000_000;

#[entry]
fn main() -> ! {
    defmt::println!("Keel bootloader init");

    let Some(mut pac) = pac::Peripherals::take() else {
        halt();
    };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        halt();
    };

    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);
    let mut led_pin = pins.gpio25.into_push_pull_output();
    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    blink(&mut led_pin, &mut timer, 3, 200);

    let Some(gate) = FlashGate::take() else {
        // Unreachable on a cold boot; something already owns flash.
        led_pin.set_high().ok();
        halt();
    };
    let mut flash = XipFlash::new(gate);

    let meta = store::read_metadata(&mut flash).ok().flatten();
    match &meta {
        Some(meta) => defmt::println!(
            "Metadata: bank {}, version {}, pending {}",
            meta.active(),
            meta.version,
            meta.pending()
        ),
        None => defmt::println!("Metadata: no valid record, probing banks"),
    }

    let plan = plan_boot(meta, &inspect::XipBanks);

    if let Some(record) = plan.persist {
        defmt::println!(
            "Persisting metadata: bank {}, version {}, attempts {}",
            record.active(),
            record.version,
            record.boot_attempts
        );
        if store::write_metadata(&mut flash, &record).is_err() {
            defmt::error!("Metadata write failed");
        }
    }

    match plan.action {
        BootAction::Jump(bank) => {
            defmt::println!("Jumping to bank {} at 0x{:08x}", bank, bank.addr());
            unsafe { jump::jump_to_bank(bank.addr()) }
        }
        BootAction::Halt => {
            defmt::println!("No valid firmware in any bank");
            led_pin.set_high().ok();
            halt();
        }
    }
}

/// Startup blink so the board shows life before any bank is entered.
fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::nop();
    }
}
