//! The GPIO arbiter: the single source of truth for pin ownership.
//! Everything else — sensor drivers, actuator drivers, the shared buses —
//! must claim a pin here before touching it, and release it through here
//! when torn down.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use trabajante_proto::ErrorCode;

use crate::board::{BoardModel, Direction};

/// Owner category recorded with each reservation; mirrors spec.md's
/// `"sensor"`/`"actuator"`/`"system"` owner strings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Owner {
    Sensor,
    Actuator,
    System,
}

#[derive(Clone, Debug)]
pub struct PinReservation {
    pub owner: Owner,
    pub component: String,
    pub direction: Direction,
}

/// Abstracts the actual electrical operation of putting a pin in a given
/// mode. `trabajante-firmware` implements this over `esp_idf_hal::gpio`;
/// tests use an in-memory fake so the arbiter's bookkeeping is verifiable
/// without hardware.
pub trait PinController {
    fn set_safe_mode(&mut self, gpio: u8) -> Result<(), ErrorCode>;
    fn set_output(&mut self, gpio: u8) -> Result<(), ErrorCode>;
    fn set_input(&mut self, gpio: u8, pull_up: bool) -> Result<(), ErrorCode>;
}

/// A `PinController` that only tracks the last mode applied to each pin;
/// used by unit tests and any test harness that doesn't have real silicon.
#[derive(Default)]
pub struct NullPinController {
    pub applied: HashMap<u8, &'static str>,
}

impl PinController for NullPinController {
    fn set_safe_mode(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        self.applied.insert(gpio, "safe");
        Ok(())
    }

    fn set_output(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        self.applied.insert(gpio, "output");
        Ok(())
    }

    fn set_input(&mut self, gpio: u8, _pull_up: bool) -> Result<(), ErrorCode> {
        self.applied.insert(gpio, "input");
        Ok(())
    }
}

/// Lets a `PinController` be shared between the arbiter and whatever else
/// needs to hand out the live driver handle a reservation just built (a
/// device factory constructing a concrete sensor/actuator driver), the
/// same way `EspI2cTransport` shares one physical bus via `Rc<RefCell<_>>`.
impl<T: PinController> PinController for Rc<RefCell<T>> {
    fn set_safe_mode(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        self.borrow_mut().set_safe_mode(gpio)
    }

    fn set_output(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        self.borrow_mut().set_output(gpio)
    }

    fn set_input(&mut self, gpio: u8, pull_up: bool) -> Result<(), ErrorCode> {
        self.borrow_mut().set_input(gpio, pull_up)
    }
}

pub struct GpioArbiter<B: BoardModel, C: PinController> {
    board: B,
    controller: C,
    reservations: HashMap<u8, PinReservation>,
    safe_mode_done: bool,
}

impl<B: BoardModel, C: PinController> GpioArbiter<B, C> {
    pub fn new(board: B, controller: C) -> Self {
        Self {
            board,
            controller,
            reservations: HashMap::new(),
            safe_mode_done: false,
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// Idempotent: sets every board-known pin to high-impedance input with
    /// pull-up (where supported) before any driver may initialize. Must be
    /// called exactly once at boot, ahead of every other subsystem.
    pub fn initialize_all_pins_to_safe_mode(&mut self) -> Result<(), ErrorCode> {
        for &gpio in self.board.known_pins() {
            self.controller
                .set_safe_mode(gpio)
                .map_err(|_| ErrorCode::GpioInitFailed)?;
        }
        self.safe_mode_done = true;
        debug!(
            "gpio arbiter: {} pins initialized to safe mode on {}",
            self.board.known_pins().len(),
            self.board.name()
        );
        Ok(())
    }

    pub fn is_pin_available(&self, gpio: u8) -> bool {
        self.board.is_known(gpio)
            && !self.board.is_system_reserved(gpio)
            && !self.reservations.contains_key(&gpio)
    }

    /// Atomic within the cooperative loop: either the whole reservation
    /// succeeds and is recorded, or nothing changes.
    pub fn request_pin(
        &mut self,
        gpio: u8,
        owner: Owner,
        component: &str,
        direction: Direction,
    ) -> Result<(), ErrorCode> {
        if !self.board.is_known(gpio) {
            return Err(ErrorCode::GpioInvalidMode);
        }
        if self.board.is_system_reserved(gpio) {
            return Err(ErrorCode::GpioReserved);
        }
        if self.reservations.contains_key(&gpio) {
            return Err(ErrorCode::GpioConflict);
        }
        if !self.board.allows_direction(gpio, direction) {
            return Err(ErrorCode::GpioInvalidMode);
        }

        match direction {
            Direction::Output => self.controller.set_output(gpio)?,
            Direction::Input => self.controller.set_input(gpio, true)?,
            Direction::Bus => {}
        }

        self.reservations.insert(
            gpio,
            PinReservation {
                owner,
                component: component.to_string(),
                direction,
            },
        );
        Ok(())
    }

    /// Reverts the pin to safe mode; a no-op if it wasn't reserved.
    pub fn release_pin(&mut self, gpio: u8) {
        if self.reservations.remove(&gpio).is_some() {
            if let Err(err) = self.controller.set_safe_mode(gpio) {
                warn!("gpio {gpio}: failed to revert to safe mode: {err}");
            }
        }
    }

    pub fn reservation(&self, gpio: u8) -> Option<&PinReservation> {
        self.reservations.get(&gpio)
    }

    pub fn reservations(&self) -> impl Iterator<Item = (&u8, &PinReservation)> {
        self.reservations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Esp32Wroom;

    fn arbiter() -> GpioArbiter<Esp32Wroom, NullPinController> {
        let mut a = GpioArbiter::new(Esp32Wroom, NullPinController::default());
        a.initialize_all_pins_to_safe_mode().unwrap();
        a
    }

    #[test]
    fn safe_mode_boot_leaves_every_pin_available() {
        let a = arbiter();
        for &gpio in a.board().known_pins() {
            if a.board().is_system_reserved(gpio) {
                continue;
            }
            assert!(a.is_pin_available(gpio), "gpio {gpio} should be available");
        }
    }

    #[test]
    fn second_claim_on_same_pin_conflicts() {
        let mut a = arbiter();
        a.request_pin(5, Owner::Actuator, "pump", Direction::Output)
            .unwrap();
        let err = a
            .request_pin(5, Owner::Sensor, "ph", Direction::Input)
            .unwrap_err();
        assert_eq!(err, ErrorCode::GpioConflict);
    }

    #[test]
    fn claiming_system_reserved_pin_fails() {
        let mut a = arbiter();
        let err = a
            .request_pin(1, Owner::Sensor, "x", Direction::Input)
            .unwrap_err();
        assert_eq!(err, ErrorCode::GpioReserved);
    }

    #[test]
    fn claiming_input_only_pin_for_output_fails_and_registry_unchanged() {
        let mut a = arbiter();
        let err = a
            .request_pin(34, Owner::Actuator, "valve", Direction::Output)
            .unwrap_err();
        assert_eq!(err, ErrorCode::GpioInvalidMode);
        assert!(a.reservation(34).is_none());
        assert!(a.is_pin_available(34));
    }

    #[test]
    fn release_reverts_to_safe_mode_and_frees_the_pin() {
        let mut a = arbiter();
        a.request_pin(5, Owner::Actuator, "pump", Direction::Output)
            .unwrap();
        assert!(!a.is_pin_available(5));
        a.release_pin(5);
        assert!(a.is_pin_available(5));
        assert_eq!(a.controller.applied.get(&5), Some(&"safe"));
    }

    #[test]
    fn release_of_unreserved_pin_is_a_no_op() {
        let mut a = arbiter();
        a.release_pin(5); // never reserved
        assert!(a.is_pin_available(5));
    }
}
