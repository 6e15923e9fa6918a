use time::macros::time;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday};
use uniwash_api::models::{ReservationOption, SlotOption};

/// A reservable (start, end) pair of wall-clock times. An end of `00:00`
/// stands for midnight of the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: Time,
    pub end: Time,
}

impl Slot {
    pub const fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    /// Resolves the slot on `date` in the zone at `offset` to UTC instants.
    pub fn resolve(&self, date: Date, offset: UtcOffset) -> Option<(OffsetDateTime, OffsetDateTime)> {
        let end_date = if self.end == Time::MIDNIGHT {
            date.next_day()?
        } else {
            date
        };

        let start = PrimitiveDateTime::new(date, self.start)
            .assume_offset(offset)
            .to_offset(UtcOffset::UTC);
        let end = PrimitiveDateTime::new(end_date, self.end)
            .assume_offset(offset)
            .to_offset(UtcOffset::UTC);

        (end > start).then_some((start, end))
    }
}

const STANDARD_DAY: &[Slot] = &[
    Slot::new(time!(07:00), time!(08:30)),
    Slot::new(time!(08:30), time!(10:00)),
    Slot::new(time!(10:00), time!(11:30)),
    Slot::new(time!(11:30), time!(13:00)),
    Slot::new(time!(13:00), time!(14:30)),
    Slot::new(time!(14:30), time!(16:00)),
    Slot::new(time!(16:00), time!(17:30)),
    Slot::new(time!(17:30), time!(19:00)),
    Slot::new(time!(19:00), time!(20:30)),
    Slot::new(time!(20:30), time!(22:00)),
    Slot::new(time!(22:00), time!(23:30)),
];

/// Fixed weekday by time-of-day grid a device can be reserved in. Days are
/// indexed from Sunday.
#[derive(Debug, Clone, Copy)]
pub struct SlotCatalog {
    days: [&'static [Slot]; 7],
}

impl SlotCatalog {
    pub const fn standard() -> Self {
        Self {
            days: [STANDARD_DAY; 7],
        }
    }

    pub fn slots_for(&self, weekday: Weekday) -> impl Iterator<Item = Slot> + '_ {
        self.days[weekday_index(weekday) as usize].iter().copied()
    }

    pub fn is_valid(&self, weekday: Weekday, start: Time, end: Time) -> bool {
        self.slots_for(weekday)
            .any(|slot| slot.start == start && slot.end == end)
    }

    /// Looks up the slot and resolves it on `date`. `None` when the pair is
    /// not in the catalog for that weekday.
    pub fn resolve(
        &self,
        date: Date,
        start: Time,
        end: Time,
        offset: UtcOffset,
    ) -> Option<(OffsetDateTime, OffsetDateTime)> {
        if !self.is_valid(date.weekday(), start, end) {
            return None;
        }

        Slot::new(start, end).resolve(date, offset)
    }

    pub fn options(&self) -> Vec<ReservationOption> {
        WEEK.iter()
            .map(|weekday| ReservationOption {
                weekday: weekday_index(*weekday),
                slots: self
                    .slots_for(*weekday)
                    .map(|slot| SlotOption {
                        start: slot.start,
                        end: slot.end,
                    })
                    .collect(),
            })
            .collect()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Sunday,
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.number_days_from_sunday()
}
