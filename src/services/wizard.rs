//! Customer reservation flow: pet and date, then time and notes, then review.
//!
//! [`transition`] is pure. Work that needs the scheduler (loading slots,
//! creating the booking) is returned as a [`WizardEffect`];
//! [`ReservationWizard`] runs those effects and feeds the outcome back in as
//! events.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::Booking;
use crate::services::lifecycle::Actor;
use crate::services::scheduler::{BookingRequest, Scheduler};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectPetAndDate,
    SelectTimeAndNotes,
    ReviewAndConfirm,
    Submitted,
    Dismissed,
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WizardStep::SelectPetAndDate => "pet and date selection",
            WizardStep::SelectTimeAndNotes => "time selection",
            WizardStep::ReviewAndConfirm => "review",
            WizardStep::Submitted => "submitted reservation",
            WizardStep::Dismissed => "dismissed reservation",
        };
        f.write_str(name)
    }
}

/// Values entered so far. Kept when moving back and forth between steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Selections {
    pub pet_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveDateTime>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardState {
    SelectPetAndDate {
        selections: Selections,
    },
    SelectTimeAndNotes {
        selections: Selections,
        slots: Vec<NaiveDateTime>,
        loading: bool,
    },
    ReviewAndConfirm {
        selections: Selections,
        submitting: bool,
        error: Option<String>,
    },
    Submitted {
        booking: Booking,
    },
    Dismissed,
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState::SelectPetAndDate {
            selections: Selections::default(),
        }
    }
}

impl WizardState {
    pub fn step(&self) -> WizardStep {
        match self {
            WizardState::SelectPetAndDate { .. } => WizardStep::SelectPetAndDate,
            WizardState::SelectTimeAndNotes { .. } => WizardStep::SelectTimeAndNotes,
            WizardState::ReviewAndConfirm { .. } => WizardStep::ReviewAndConfirm,
            WizardState::Submitted { .. } => WizardStep::Submitted,
            WizardState::Dismissed => WizardStep::Dismissed,
        }
    }

    pub fn selections(&self) -> Option<&Selections> {
        match self {
            WizardState::SelectPetAndDate { selections }
            | WizardState::SelectTimeAndNotes { selections, .. }
            | WizardState::ReviewAndConfirm { selections, .. } => Some(selections),
            WizardState::Submitted { .. } | WizardState::Dismissed => None,
        }
    }

    /// Slots offered in the time step; empty elsewhere.
    pub fn slots(&self) -> &[NaiveDateTime] {
        match self {
            WizardState::SelectTimeAndNotes { slots, .. } => slots,
            _ => &[],
        }
    }

    /// Whether `Next` would be accepted, for enabling the forward control.
    pub fn can_advance(&self) -> bool {
        missing_for_next(self).is_none()
            && matches!(
                self,
                WizardState::SelectPetAndDate { .. }
                    | WizardState::SelectTimeAndNotes { loading: false, .. }
                    | WizardState::ReviewAndConfirm {
                        submitting: false,
                        ..
                    }
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    SelectPet(String),
    SelectDate(NaiveDate),
    SelectTime(NaiveDateTime),
    SetNotes(String),
    Next,
    Back,
    Submit,
    SlotsLoaded(Vec<NaiveDateTime>),
    SubmitSucceeded(Booking),
    SubmitFailed(String),
    Dismiss,
}

impl WizardEvent {
    fn action(&self) -> &'static str {
        match self {
            WizardEvent::SelectPet(_) => "select a pet",
            WizardEvent::SelectDate(_) => "select a date",
            WizardEvent::SelectTime(_) => "select a time",
            WizardEvent::SetNotes(_) => "edit notes",
            WizardEvent::Next => "go forward",
            WizardEvent::Back => "go back",
            WizardEvent::Submit => "submit",
            WizardEvent::SlotsLoaded(_) => "load slots",
            WizardEvent::SubmitSucceeded(_) | WizardEvent::SubmitFailed(_) => "finish submission",
            WizardEvent::Dismiss => "dismiss",
        }
    }
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEffect {
    LoadSlots {
        date: NaiveDate,
        pet_id: String,
    },
    CreateBooking {
        pet_id: String,
        start_at: NaiveDateTime,
        notes: String,
    },
}

pub fn transition(
    state: &WizardState,
    event: WizardEvent,
) -> Result<(WizardState, Option<WizardEffect>), AppError> {
    let step = state.step();
    let not_allowed = |event: &WizardEvent| AppError::StepNotAllowed {
        step,
        action: event.action(),
    };

    if event == WizardEvent::Dismiss {
        return Ok((WizardState::Dismissed, None));
    }

    match (state, event) {
        (WizardState::SelectPetAndDate { selections }, WizardEvent::SelectPet(pet_id)) => {
            let selections = Selections {
                pet_id: Some(pet_id),
                ..selections.clone()
            };
            Ok((WizardState::SelectPetAndDate { selections }, None))
        }
        (WizardState::SelectPetAndDate { selections }, WizardEvent::SelectDate(date)) => {
            let selections = Selections {
                date: Some(date),
                ..selections.clone()
            };
            Ok((WizardState::SelectPetAndDate { selections }, None))
        }
        (WizardState::SelectPetAndDate { selections }, WizardEvent::Next) => {
            if let Some(missing) = missing_for_next(state) {
                return Err(AppError::IncompleteStep { step, missing });
            }
            enter_time_step(selections.clone())
        }

        (
            WizardState::SelectTimeAndNotes {
                selections,
                loading: true,
                ..
            },
            WizardEvent::SlotsLoaded(slots),
        ) => {
            let mut selections = selections.clone();
            if selections.time.is_some_and(|t| !slots.contains(&t)) {
                selections.time = None;
            }
            Ok((
                WizardState::SelectTimeAndNotes {
                    selections,
                    slots,
                    loading: false,
                },
                None,
            ))
        }
        (
            WizardState::SelectTimeAndNotes {
                selections,
                slots,
                loading: false,
            },
            WizardEvent::SelectTime(time),
        ) => {
            if !slots.contains(&time) {
                return Err(AppError::SlotUnavailable(time));
            }
            Ok((
                WizardState::SelectTimeAndNotes {
                    selections: Selections {
                        time: Some(time),
                        ..selections.clone()
                    },
                    slots: slots.clone(),
                    loading: false,
                },
                None,
            ))
        }
        (
            WizardState::SelectTimeAndNotes {
                selections,
                slots,
                loading,
            },
            WizardEvent::SetNotes(notes),
        ) => Ok((
            WizardState::SelectTimeAndNotes {
                selections: Selections {
                    notes,
                    ..selections.clone()
                },
                slots: slots.clone(),
                loading: *loading,
            },
            None,
        )),
        (
            WizardState::SelectTimeAndNotes {
                selections,
                loading: false,
                ..
            },
            WizardEvent::Next,
        ) => {
            if let Some(missing) = missing_for_next(state) {
                return Err(AppError::IncompleteStep { step, missing });
            }
            Ok((
                WizardState::ReviewAndConfirm {
                    selections: selections.clone(),
                    submitting: false,
                    error: None,
                },
                None,
            ))
        }
        (WizardState::SelectTimeAndNotes { selections, .. }, WizardEvent::Back) => Ok((
            WizardState::SelectPetAndDate {
                selections: selections.clone(),
            },
            None,
        )),

        (
            WizardState::ReviewAndConfirm {
                selections,
                submitting: false,
                ..
            },
            WizardEvent::Submit | WizardEvent::Next,
        ) => {
            let (Some(pet_id), Some(start_at)) = (selections.pet_id.clone(), selections.time) else {
                return Err(AppError::IncompleteStep {
                    step,
                    missing: "time",
                });
            };
            Ok((
                WizardState::ReviewAndConfirm {
                    selections: selections.clone(),
                    submitting: true,
                    error: None,
                },
                Some(WizardEffect::CreateBooking {
                    pet_id,
                    start_at,
                    notes: selections.notes.clone(),
                }),
            ))
        }
        (
            WizardState::ReviewAndConfirm {
                submitting: true, ..
            },
            WizardEvent::SubmitSucceeded(booking),
        ) => Ok((WizardState::Submitted { booking }, None)),
        (
            WizardState::ReviewAndConfirm {
                selections,
                submitting: true,
                ..
            },
            WizardEvent::SubmitFailed(reason),
        ) => Ok((
            WizardState::ReviewAndConfirm {
                selections: selections.clone(),
                submitting: false,
                error: Some(reason),
            },
            None,
        )),
        (
            WizardState::ReviewAndConfirm {
                selections,
                submitting: false,
                ..
            },
            WizardEvent::Back,
        ) => enter_time_step(selections.clone()),

        (_, event) => Err(not_allowed(&event)),
    }
}

fn enter_time_step(selections: Selections) -> Result<(WizardState, Option<WizardEffect>), AppError> {
    let step = WizardStep::SelectTimeAndNotes;
    let date = selections
        .date
        .ok_or(AppError::IncompleteStep { step, missing: "date" })?;
    let pet_id = selections
        .pet_id
        .clone()
        .ok_or(AppError::IncompleteStep { step, missing: "pet" })?;
    Ok((
        WizardState::SelectTimeAndNotes {
            selections,
            slots: vec![],
            loading: true,
        },
        Some(WizardEffect::LoadSlots { date, pet_id }),
    ))
}

fn missing_for_next(state: &WizardState) -> Option<&'static str> {
    match state {
        WizardState::SelectPetAndDate { selections } => {
            if selections.pet_id.is_none() {
                Some("pet")
            } else if selections.date.is_none() {
                Some("date")
            } else {
                None
            }
        }
        WizardState::SelectTimeAndNotes {
            selections, slots, ..
        } => match selections.time {
            Some(time) if slots.contains(&time) => None,
            _ => Some("time"),
        },
        WizardState::ReviewAndConfirm { .. } => None,
        WizardState::Submitted { .. } | WizardState::Dismissed => Some("a fresh reservation"),
    }
}

/// Runs the reservation flow for one customer and one service against a
/// [`Scheduler`]. A wizard that reached `Submitted` or `Dismissed` is spent;
/// start a new one for another booking.
pub struct ReservationWizard {
    scheduler: Scheduler,
    customer: Actor,
    service_id: String,
    state: WizardState,
}

impl ReservationWizard {
    pub fn new(scheduler: Scheduler, customer: Actor, service_id: &str) -> Result<Self, AppError> {
        let service = scheduler.service(service_id)?;
        if !service.is_active {
            return Err(AppError::InactiveService(service.id));
        }
        Ok(Self {
            scheduler,
            customer,
            service_id: service.id,
            state: WizardState::default(),
        })
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step()
    }

    /// Applies `event` and runs any resulting effect.
    ///
    /// A failed submission returns the error and leaves the wizard in review
    /// with the reason recorded. `NotFound` from the scheduler aborts the
    /// flow.
    pub fn dispatch(&mut self, event: WizardEvent) -> Result<&WizardState, AppError> {
        let (next, effect) = transition(&self.state, event)?;
        let previous = std::mem::replace(&mut self.state, next);

        match effect {
            None => {}
            Some(WizardEffect::LoadSlots { date, pet_id }) => {
                match self
                    .scheduler
                    .available_slots(&self.service_id, date, Some(&pet_id))
                {
                    Ok(slots) => self.apply(WizardEvent::SlotsLoaded(slots))?,
                    Err(e) => {
                        self.state = match e {
                            AppError::NotFound(_) => WizardState::Dismissed,
                            _ => previous,
                        };
                        return Err(e);
                    }
                }
            }
            Some(WizardEffect::CreateBooking {
                pet_id,
                start_at,
                notes,
            }) => {
                let request = BookingRequest {
                    service_id: self.service_id.clone(),
                    pet_id,
                    start_at,
                    note: Some(notes),
                };
                match self.scheduler.create_booking(&self.customer, request) {
                    Ok(booking) => self.apply(WizardEvent::SubmitSucceeded(booking))?,
                    Err(e @ AppError::NotFound(_)) => {
                        self.state = WizardState::Dismissed;
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(
                            service_id = %self.service_id,
                            actor = %self.customer,
                            error = %e,
                            "reservation submission failed"
                        );
                        self.apply(WizardEvent::SubmitFailed(e.to_string()))?;
                        return Err(e);
                    }
                }
            }
        }

        Ok(&self.state)
    }

    fn apply(&mut self, event: WizardEvent) -> Result<(), AppError> {
        let (next, _) = transition(&self.state, event)?;
        self.state = next;
        Ok(())
    }
}
