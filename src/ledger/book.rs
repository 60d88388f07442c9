//! The ledger itself.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;

use super::slot::{Reservation, ResourceSlot, ResourceType, SlotKey};
use crate::error::{PlanningError, Result};

/// Ledger shared between a scheduling run and confirmation/expiry sweeps.
pub type SharedLedger = Arc<Mutex<ResourceLedger>>;

/// Wraps a ledger for shared use.
pub fn shared(ledger: ResourceLedger) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}

/// Aggregate usage of one resource class across all seeded weeks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    /// Sum of weekly capacities.
    pub capacity: u64,
    /// Sum of soft reservations.
    pub soft: u64,
    /// Sum of hard reservations.
    pub hard: u64,
}

impl Utilization {
    /// Fraction of capacity in use, 0.0 when no capacity is seeded.
    pub fn ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.soft + self.hard) as f64 / self.capacity as f64
        }
    }
}

/// Weekly capacity ledger with soft/hard reservation accounting.
///
/// # Examples
///
/// ```
/// use u_capital::ledger::{ResourceLedger, ResourceType};
///
/// let crew = ResourceType::new("water_crew");
/// let mut ledger = ResourceLedger::new().with_weekly_capacity(crew.clone(), 2025, 1..=12, 3);
///
/// ledger.reserve_soft(&crew, 1, 2025, 2).unwrap();
/// assert!(ledger.reserve_soft(&crew, 1, 2025, 2).is_err());
///
/// ledger.promote(&crew, 1, 2025, 2).unwrap();
/// let slot = ledger.check_availability(&crew, 1, 2025).unwrap();
/// assert_eq!((slot.soft_allocated, slot.hard_allocated), (0, 2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    slots: BTreeMap<SlotKey, ResourceSlot>,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `capacity` for every week in `weeks`. Slots that already exist
    /// are left untouched; use [`set_capacity`](Self::set_capacity) to change them.
    pub fn with_weekly_capacity(
        mut self,
        resource: impl Into<ResourceType>,
        year: i32,
        weeks: RangeInclusive<u32>,
        capacity: u32,
    ) -> Self {
        let resource = resource.into();
        for week in weeks {
            self.slots
                .entry(SlotKey::new(resource.clone(), week, year))
                .or_insert_with(|| ResourceSlot::new(capacity));
        }
        self
    }

    /// Sets the capacity of one slot, creating it if needed.
    ///
    /// Fails if the new capacity is below what is already reserved.
    pub fn set_capacity(
        &mut self,
        resource: &ResourceType,
        week: u32,
        year: i32,
        capacity: u32,
    ) -> Result<()> {
        let key = SlotKey::new(resource.clone(), week, year);
        let slot = self.slots.entry(key.clone()).or_default();
        if slot.total_allocated() > capacity {
            return Err(PlanningError::CapacityExceeded {
                key,
                requested: slot.total_allocated(),
                available: capacity,
            });
        }
        slot.capacity = capacity;
        Ok(())
    }

    /// Returns the counters of a slot.
    pub fn check_availability(
        &self,
        resource: &ResourceType,
        week: u32,
        year: i32,
    ) -> Result<ResourceSlot> {
        let key = SlotKey::new(resource.clone(), week, year);
        self.slots
            .get(&key)
            .copied()
            .ok_or(PlanningError::UnknownSlot(key))
    }

    /// Free units in a slot; unknown slots have none.
    pub fn free(&self, resource: &ResourceType, week: u32, year: i32) -> u32 {
        self.slots
            .get(&SlotKey::new(resource.clone(), week, year))
            .map_or(0, ResourceSlot::available)
    }

    /// Free units per week over `weeks`, in order.
    pub fn free_profile(
        &self,
        resource: &ResourceType,
        year: i32,
        weeks: RangeInclusive<u32>,
    ) -> Vec<u32> {
        weeks.map(|w| self.free(resource, w, year)).collect()
    }

    /// Resource classes with at least one seeded slot.
    pub fn resource_types(&self) -> BTreeSet<ResourceType> {
        self.slots.keys().map(|k| k.resource.clone()).collect()
    }

    /// Iterates over all slots in key order.
    pub fn slots(&self) -> impl Iterator<Item = (&SlotKey, &ResourceSlot)> {
        self.slots.iter()
    }

    /// Tentatively reserves `amount` units.
    pub fn reserve_soft(
        &mut self,
        resource: &ResourceType,
        week: u32,
        year: i32,
        amount: u32,
    ) -> Result<()> {
        self.reserve(Reservation::Soft, resource, week, year, amount)
    }

    /// Reserves `amount` committed units.
    pub fn reserve_hard(
        &mut self,
        resource: &ResourceType,
        week: u32,
        year: i32,
        amount: u32,
    ) -> Result<()> {
        self.reserve(Reservation::Hard, resource, week, year, amount)
    }

    /// Reserves `amount` units of the given kind.
    pub fn reserve(
        &mut self,
        kind: Reservation,
        resource: &ResourceType,
        week: u32,
        year: i32,
        amount: u32,
    ) -> Result<()> {
        let key = SlotKey::new(resource.clone(), week, year);
        let slot = self.check_reserve(&key, amount)?;
        match kind {
            Reservation::Soft => slot.soft_allocated += amount,
            Reservation::Hard => slot.hard_allocated += amount,
        }
        tracing::debug!(%key, %kind, amount, "reserved");
        Ok(())
    }

    /// Converts `amount` soft units into hard units. Total usage is unchanged.
    pub fn promote(
        &mut self,
        resource: &ResourceType,
        week: u32,
        year: i32,
        amount: u32,
    ) -> Result<()> {
        let key = SlotKey::new(resource.clone(), week, year);
        let slot = self.check_draw(&key, Reservation::Soft, amount)?;
        slot.soft_allocated -= amount;
        slot.hard_allocated += amount;
        tracing::debug!(%key, amount, "promoted soft to hard");
        Ok(())
    }

    /// Gives back `amount` units of the given kind.
    pub fn release(
        &mut self,
        kind: Reservation,
        resource: &ResourceType,
        week: u32,
        year: i32,
        amount: u32,
    ) -> Result<()> {
        let key = SlotKey::new(resource.clone(), week, year);
        let slot = self.check_draw(&key, kind, amount)?;
        match kind {
            Reservation::Soft => slot.soft_allocated -= amount,
            Reservation::Hard => slot.hard_allocated -= amount,
        }
        tracing::debug!(%key, %kind, amount, "released");
        Ok(())
    }

    /// Reserves `amount` in every week of `weeks`, or nothing at all.
    pub fn reserve_range(
        &mut self,
        kind: Reservation,
        resource: &ResourceType,
        year: i32,
        weeks: RangeInclusive<u32>,
        amount: u32,
    ) -> Result<()> {
        for week in weeks.clone() {
            self.check_reserve(&SlotKey::new(resource.clone(), week, year), amount)?;
        }
        for week in weeks {
            self.reserve(kind, resource, week, year, amount)?;
        }
        Ok(())
    }

    /// Promotes `amount` in every week of `weeks`, or nothing at all.
    pub fn promote_range(
        &mut self,
        resource: &ResourceType,
        year: i32,
        weeks: RangeInclusive<u32>,
        amount: u32,
    ) -> Result<()> {
        for week in weeks.clone() {
            self.check_draw(
                &SlotKey::new(resource.clone(), week, year),
                Reservation::Soft,
                amount,
            )?;
        }
        for week in weeks {
            self.promote(resource, week, year, amount)?;
        }
        Ok(())
    }

    /// Releases `amount` in every week of `weeks`, or nothing at all.
    pub fn release_range(
        &mut self,
        kind: Reservation,
        resource: &ResourceType,
        year: i32,
        weeks: RangeInclusive<u32>,
        amount: u32,
    ) -> Result<()> {
        for week in weeks.clone() {
            self.check_draw(&SlotKey::new(resource.clone(), week, year), kind, amount)?;
        }
        for week in weeks {
            self.release(kind, resource, week, year, amount)?;
        }
        Ok(())
    }

    /// Audits every slot. A failure here means a correctness bug upstream.
    pub fn verify(&self) -> Result<()> {
        for (key, slot) in &self.slots {
            if !slot.is_consistent() {
                tracing::error!(%key, ?slot, "ledger invariant broken");
                return Err(PlanningError::InvariantViolation(format!(
                    "{key}: soft {} + hard {} > capacity {}",
                    slot.soft_allocated, slot.hard_allocated, slot.capacity
                )));
            }
        }
        Ok(())
    }

    /// Usage totals for one resource class.
    pub fn utilization(&self, resource: &ResourceType) -> Utilization {
        self.slots
            .iter()
            .filter(|(k, _)| &k.resource == resource)
            .fold(
                Utilization {
                    capacity: 0,
                    soft: 0,
                    hard: 0,
                },
                |acc, (_, s)| Utilization {
                    capacity: acc.capacity + u64::from(s.capacity),
                    soft: acc.soft + u64::from(s.soft_allocated),
                    hard: acc.hard + u64::from(s.hard_allocated),
                },
            )
    }

    fn check_reserve(&mut self, key: &SlotKey, amount: u32) -> Result<&mut ResourceSlot> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| PlanningError::UnknownSlot(key.clone()))?;
        if amount > slot.available() {
            return Err(PlanningError::CapacityExceeded {
                key: key.clone(),
                requested: amount,
                available: slot.available(),
            });
        }
        Ok(slot)
    }

    fn check_draw(
        &mut self,
        key: &SlotKey,
        kind: Reservation,
        amount: u32,
    ) -> Result<&mut ResourceSlot> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| PlanningError::UnknownSlot(key.clone()))?;
        if slot.held(kind) < amount {
            return Err(PlanningError::ReleaseUnderflow {
                key: key.clone(),
                kind,
                requested: amount,
                held: slot.held(kind),
            });
        }
        Ok(slot)
    }
}
