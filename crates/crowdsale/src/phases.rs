// crowdsale/src/phases.rs

use crate::{CrowdsaleError, CrowdsaleResult};
use lty_primitives::Timestamp;
use serde::{Deserialize, Serialize};

/// Time window carrying a bonus percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// First second of the phase (inclusive)
    pub start_time: Timestamp,
    /// Last second of the phase (inclusive)
    pub end_time: Timestamp,
    /// Extra tokens granted, in percent of the base amount
    pub bonus_percent: u32,
}

impl Phase {
    pub fn new(start_time: Timestamp, end_time: Timestamp, bonus_percent: u32) -> Self {
        Self {
            start_time,
            end_time,
            bonus_percent,
        }
    }

    /// Whether `now` lies in `[start_time, end_time]`
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

/// Indexed phase slots.
///
/// Slots may be empty. Configured phases never overlap, but slot order
/// says nothing about time order: a deleted phase can be re-added at the
/// end. Lookups scan linearly; the number of phases is small and operator
/// controlled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    slots: Vec<Option<Phase>>,
}

impl PhaseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_phases(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Phase>] {
        &self.slots
    }

    /// Resize to `total` empty slots, dropping every configured phase
    pub fn set_total_phases(&mut self, total: usize) {
        self.slots = vec![None; total];
    }

    /// Configure slot `index`, replacing whatever it held
    pub fn set_phase(&mut self, index: usize, phase: Phase) -> CrowdsaleResult<()> {
        self.check_index(index)?;
        self.validate_window(index, phase.start_time, phase.end_time)?;
        self.slots[index] = Some(phase);
        Ok(())
    }

    /// Append a new slot holding `phase`; returns its index
    pub fn add_phase(&mut self, phase: Phase) -> CrowdsaleResult<usize> {
        let index = self.slots.len();
        if phase.start_time == phase.end_time {
            return Err(CrowdsaleError::InvalidWindow(format!(
                "appended phase [{}, {}] is empty",
                phase.start_time, phase.end_time
            )));
        }
        self.validate_window(index, phase.start_time, phase.end_time)?;
        self.slots.push(Some(phase));
        Ok(index)
    }

    /// Clear slot `index`; the slot count is unchanged
    pub fn del_phase(&mut self, index: usize) -> CrowdsaleResult<()> {
        self.check_index(index)?;
        self.slots[index] = None;
        Ok(())
    }

    /// Slot contents (`None` for an empty slot)
    pub fn phase(&self, index: usize) -> CrowdsaleResult<Option<Phase>> {
        self.check_index(index)?;
        Ok(self.slots[index])
    }

    /// Whether `[start, end]` would be accepted in slot `index`.
    ///
    /// The window may not overlap any other configured phase. The slot's
    /// current content is ignored so that a phase can be overwritten in
    /// place.
    pub fn validate_window(&self, index: usize, start: Timestamp, end: Timestamp) -> CrowdsaleResult<()> {
        if start > end {
            return Err(CrowdsaleError::InvalidWindow(format!(
                "start {} is after end {}",
                start, end
            )));
        }

        for (other, slot) in self.slots.iter().enumerate() {
            let Some(existing) = slot else { continue };
            if other == index {
                continue;
            }

            if start <= existing.end_time && existing.start_time <= end {
                return Err(CrowdsaleError::InvalidWindow(format!(
                    "[{}, {}] overlaps phase {} [{}, {}]",
                    start, end, other, existing.start_time, existing.end_time
                )));
            }
        }

        Ok(())
    }

    /// Whether `[start, end]` could be appended as a new phase.
    /// Appended phases must last longer than a single second.
    pub fn validate_phase_dates(&self, start: Timestamp, end: Timestamp) -> bool {
        start < end && self.validate_window(self.slots.len(), start, end).is_ok()
    }

    /// Configured phase containing `now`, with its index
    pub fn active_phase(&self, now: Timestamp) -> Option<(usize, Phase)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| slot.filter(|p| p.contains(now)).map(|p| (index, p)))
    }

    pub fn is_in_phase(&self, now: Timestamp) -> bool {
        self.active_phase(now).is_some()
    }

    /// Bonus of the phase containing `now`
    pub fn bonus_percent(&self, now: Timestamp) -> CrowdsaleResult<u32> {
        self.active_phase(now)
            .map(|(_, phase)| phase.bonus_percent)
            .ok_or(CrowdsaleError::NoActivePhase(now))
    }

    fn check_index(&self, index: usize) -> CrowdsaleResult<()> {
        if index >= self.slots.len() {
            return Err(CrowdsaleError::IndexOutOfRange {
                index,
                len: self.slots.len(),
            });
        }
        Ok(())
    }
}
