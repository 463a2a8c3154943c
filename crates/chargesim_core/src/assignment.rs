//! Station assignment policy.
//!
//! Greedy and stateless per decision: each arrival is placed at the best
//! station available right now, with no lookahead and no rebalancing of
//! vehicles that are already queued.

use chrono::{DateTime, Utc};

use crate::station::Station;

/// Pick the station for a new arrival, or `None` when no station can take it.
///
/// A station is eligible when it can accept the vehicle right now: a free
/// slot, or room in its waiting queue. Eligible stations are ranked by total
/// load (charging + waiting), then by estimated wait, then by id.
pub(crate) fn choose_station(stations: &[Station], now: DateTime<Utc>) -> Option<usize> {
    stations
        .iter()
        .enumerate()
        .filter(|(_, station)| station.has_free_slot() || !station.is_queue_full())
        .min_by(|(_, a), (_, b)| {
            a.load()
                .cmp(&b.load())
                .then_with(|| {
                    a.estimated_wait_min(now)
                        .total_cmp(&b.estimated_wait_min(now))
                })
                .then_with(|| a.id().cmp(&b.id()))
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Vehicle, VehicleClass};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn vehicle(id: u64, power_kw: f64, arrived: DateTime<Utc>) -> Vehicle {
        Vehicle::new(id, VehicleClass::Car, 100.0, 20.0, 80.0, power_kw, arrived)
    }

    fn fill(station: &mut Station, count: usize, power_kw: f64, now: DateTime<Utc>) {
        for id in 0..count {
            station.admit(vehicle(id as u64, power_kw, now), now);
        }
    }

    #[test]
    fn test_prefers_lowest_load() {
        let now = t0();
        let mut busy = Station::new(0, 4, 5);
        let mut idle = Station::new(1, 4, 5);
        fill(&mut busy, 3, 60.0, now);
        fill(&mut idle, 1, 60.0, now);

        // Load 3 vs load 1: the second station wins.
        assert_eq!(choose_station(&[busy, idle], now), Some(1));
    }

    #[test]
    fn test_full_queue_is_ineligible() {
        let now = t0();
        let mut full_queue = Station::new(0, 1, 1);
        fill(&mut full_queue, 2, 60.0, now);
        // Same total load, but its queue still has room.
        let mut open = Station::new(1, 2, 1);
        fill(&mut open, 2, 60.0, now);

        // Station 0 would win the id tie-break, yet a full queue
        // disqualifies it outright.
        assert_eq!(choose_station(&[full_queue.clone(), open], now), Some(1));

        // And with nothing else available there is nowhere to go.
        assert_eq!(choose_station(&[full_queue], now), None);
    }

    #[test]
    fn test_wait_time_breaks_load_ties() {
        let now = t0();
        // Both stations: one slot, one charger, equal load.
        let mut slow = Station::new(0, 1, 5);
        let mut fast = Station::new(1, 1, 5);
        // 60 kW takes an hour for the standard test vehicle, 120 kW half that.
        fill(&mut slow, 1, 60.0, now);
        fill(&mut fast, 1, 120.0, now);

        assert_eq!(choose_station(&[slow, fast], now), Some(1));
    }

    #[test]
    fn test_id_breaks_remaining_ties() {
        let now = t0();
        let stations = [Station::new(0, 2, 5), Station::new(1, 2, 5)];
        assert_eq!(choose_station(&stations, now), Some(0));
    }

    #[test]
    fn test_zero_queue_still_admits_into_free_slots() {
        let now = t0();
        let mut station = Station::new(0, 1, 0);

        // A queueless station is eligible while a slot is free...
        assert_eq!(choose_station(std::slice::from_ref(&station), now), Some(0));

        // ...and drops out as soon as the slot is taken.
        station.admit(vehicle(1, 60.0, now), now);
        assert_eq!(choose_station(&[station], now), None);
    }

    #[test]
    fn test_no_stations() {
        assert_eq!(choose_station(&[], t0()), None);
    }
}
