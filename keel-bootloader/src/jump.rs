// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Control transfer into a firmware bank.
//!
//! Images execute in place, so the jump is: point VTOR at the bank, load
//! its initial stack pointer, branch to its reset handler. Everything that
//! decides *which* bank is ordinary checked logic; only this final step is
//! unsafe.

/// Transfer control to the image at `bank_addr`.
///
/// # Safety
/// `bank_addr` must point at a validated vector table. Never returns.
pub unsafe fn jump_to_bank(bank_addr: u32) -> ! {
    cortex_m::interrupt::disable();

    // Relocate the vector table before touching the stack pointer.
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(bank_addr);
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let initial_sp = (bank_addr as *const u32).read_volatile();
    let reset_vector = (bank_addr as *const u32).offset(1).read_volatile();

    core::arch::asm!(
        "msr msp, {sp}",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
