//! Append-only keyframe store with snapshot reads.
//!
//! Writers append under a short write lock. Readers take an `Arc` snapshot of
//! the track at call time, so a resolver running next to a recorder sees each
//! keyframe either fully or not at all. Appends after a snapshot is taken are
//! not visible to it.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::keyframe::Keyframe;

/// Immutable view of a track at one instant.
///
/// Lookups break timestamp ties in favour of the keyframe recorded last.
/// Tracks appended in time order are searched by bisection; out-of-order
/// tracks fall back to a linear scan.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    frames: Arc<Vec<Keyframe>>,
    sorted: bool,
}

impl Default for TrackSnapshot {
    fn default() -> Self {
        Self {
            frames: Arc::default(),
            sorted: true,
        }
    }
}

impl TrackSnapshot {
    /// Build a snapshot over an owned track.
    pub fn from_keyframes(frames: Vec<Keyframe>) -> Self {
        let sorted = is_time_ordered(&frames);
        Self {
            frames: Arc::new(frames),
            sorted,
        }
    }

    /// Keyframes in recording order.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.frames
    }

    /// Whether timestamps never decrease in recording order.
    pub fn is_time_ordered(&self) -> bool {
        self.sorted
    }

    /// Last keyframe whose timestamp is `<= t`.
    pub fn find_last_at_or_before(&self, t: f64) -> Option<&Keyframe> {
        if t.is_nan() {
            return None;
        }
        if self.sorted {
            let idx = self.frames.partition_point(|k| k.timestamp <= t);
            return idx.checked_sub(1).map(|i| &self.frames[i]);
        }

        let mut best: Option<&Keyframe> = None;
        for keyframe in self.frames.iter().filter(|k| k.timestamp <= t) {
            if best.map_or(true, |b| keyframe.timestamp >= b.timestamp) {
                best = Some(keyframe);
            }
        }
        best
    }

    /// First keyframe whose timestamp is `>= t`.
    pub fn find_at_or_after(&self, t: f64) -> Option<&Keyframe> {
        if t.is_nan() {
            return None;
        }
        if self.sorted {
            let start = self.frames.partition_point(|k| k.timestamp < t);
            let first = self.frames.get(start)?;
            let end = self.frames.partition_point(|k| k.timestamp <= first.timestamp);
            return Some(&self.frames[end - 1]);
        }

        let mut best: Option<&Keyframe> = None;
        for keyframe in self.frames.iter().filter(|k| k.timestamp >= t) {
            if best.map_or(true, |b| keyframe.timestamp <= b.timestamp) {
                best = Some(keyframe);
            }
        }
        best
    }

    /// Keyframe with the smallest timestamp.
    pub fn earliest(&self) -> Option<&Keyframe> {
        self.find_at_or_after(f64::NEG_INFINITY)
    }

    /// Keyframe with the largest timestamp.
    pub fn latest(&self) -> Option<&Keyframe> {
        self.find_last_at_or_before(f64::INFINITY)
    }

    /// Track duration: the largest recorded timestamp, or zero when empty.
    pub fn duration(&self) -> f64 {
        self.latest().map(|k| k.timestamp.max(0.0)).unwrap_or(0.0)
    }

    /// Copy the keyframes out.
    pub fn to_vec(&self) -> Vec<Keyframe> {
        self.frames.as_ref().clone()
    }
}

impl Deref for TrackSnapshot {
    type Target = [Keyframe];

    fn deref(&self) -> &[Keyframe] {
        &self.frames
    }
}

impl From<Vec<Keyframe>> for TrackSnapshot {
    fn from(frames: Vec<Keyframe>) -> Self {
        Self::from_keyframes(frames)
    }
}

/// Append-only, time-indexed keyframe track.
#[derive(Debug, Default)]
pub struct KeyframeStore {
    track: RwLock<TrackSnapshot>,
}

impl KeyframeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyframe. No timestamp validation is performed.
    pub fn append(&self, keyframe: Keyframe) {
        let mut track = self.track.write();
        let in_order = !keyframe.timestamp.is_nan()
            && track
                .frames
                .last()
                .map_or(true, |last| last.timestamp <= keyframe.timestamp);
        track.sorted &= in_order;
        Arc::make_mut(&mut track.frames).push(keyframe);
    }

    /// Drop every keyframe.
    pub fn clear(&self) {
        *self.track.write() = TrackSnapshot::default();
    }

    /// Replace the whole track, e.g. with a loaded document.
    pub fn replace(&self, frames: Vec<Keyframe>) {
        *self.track.write() = TrackSnapshot::from_keyframes(frames);
    }

    /// Snapshot of the track in insertion order.
    pub fn all(&self) -> TrackSnapshot {
        self.track.read().clone()
    }

    pub fn len(&self) -> usize {
        self.track.read().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// See [`TrackSnapshot::find_at_or_after`].
    pub fn find_at_or_after(&self, t: f64) -> Option<Keyframe> {
        self.all().find_at_or_after(t).copied()
    }

    /// See [`TrackSnapshot::find_last_at_or_before`].
    pub fn find_last_at_or_before(&self, t: f64) -> Option<Keyframe> {
        self.all().find_last_at_or_before(t).copied()
    }
}

impl From<Vec<Keyframe>> for KeyframeStore {
    fn from(frames: Vec<Keyframe>) -> Self {
        Self {
            track: RwLock::new(TrackSnapshot::from_keyframes(frames)),
        }
    }
}

fn is_time_ordered(frames: &[Keyframe]) -> bool {
    frames.iter().all(|k| !k.timestamp.is_nan())
        && frames.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CropRect;
    use proptest::prelude::*;

    fn kf(t: f64, tag: f64) -> Keyframe {
        Keyframe::new(t, CropRect::new(tag, 0.0, 100.0, 100.0), 0.8, 1.0)
    }

    #[test]
    fn test_empty_store_lookups_return_none() {
        let store = KeyframeStore::new();
        assert!(store.is_empty());
        assert!(store.find_at_or_after(0.0).is_none());
        assert!(store.find_last_at_or_before(10.0).is_none());
        assert_eq!(store.all().duration(), 0.0);
    }

    #[test]
    fn test_last_at_or_before() {
        let store = KeyframeStore::from(vec![kf(0.0, 1.0), kf(2.0, 2.0), kf(4.0, 3.0)]);
        assert_eq!(store.find_last_at_or_before(3.0).unwrap().rect.x, 2.0);
        assert_eq!(store.find_last_at_or_before(4.0).unwrap().rect.x, 3.0);
        assert_eq!(store.find_last_at_or_before(100.0).unwrap().rect.x, 3.0);
        assert!(store.find_last_at_or_before(-0.5).is_none());
    }

    #[test]
    fn test_at_or_after() {
        let store = KeyframeStore::from(vec![kf(0.0, 1.0), kf(2.0, 2.0), kf(4.0, 3.0)]);
        assert_eq!(store.find_at_or_after(0.5).unwrap().rect.x, 2.0);
        assert_eq!(store.find_at_or_after(2.0).unwrap().rect.x, 2.0);
        assert!(store.find_at_or_after(4.5).is_none());
    }

    #[test]
    fn test_equal_timestamps_prefer_last_recorded() {
        let store = KeyframeStore::new();
        store.append(kf(1.0, 1.0));
        store.append(kf(1.0, 2.0));
        store.append(kf(1.0, 3.0));
        store.append(kf(2.0, 4.0));
        assert!(store.all().is_time_ordered());

        assert_eq!(store.find_last_at_or_before(1.5).unwrap().rect.x, 3.0);
        assert_eq!(store.find_at_or_after(0.5).unwrap().rect.x, 3.0);
    }

    #[test]
    fn test_out_of_order_appends_still_resolve() {
        let store = KeyframeStore::new();
        store.append(kf(4.0, 3.0));
        store.append(kf(0.0, 1.0));
        store.append(kf(2.0, 2.0));
        store.append(kf(2.0, 5.0));

        let snapshot = store.all();
        assert!(!snapshot.is_time_ordered());
        assert_eq!(snapshot.find_last_at_or_before(3.0).unwrap().rect.x, 5.0);
        assert_eq!(snapshot.find_at_or_after(1.0).unwrap().rect.x, 5.0);
        assert_eq!(snapshot.earliest().unwrap().rect.x, 1.0);
        assert_eq!(snapshot.latest().unwrap().rect.x, 3.0);
        assert_eq!(snapshot.duration(), 4.0);
    }

    #[test]
    fn test_sorted_and_linear_paths_agree() {
        let ordered = vec![kf(0.0, 1.0), kf(1.0, 2.0), kf(1.0, 3.0), kf(3.0, 4.0)];
        let shuffled = vec![ordered[3], ordered[0], ordered[1], ordered[2]];
        let sorted = TrackSnapshot::from_keyframes(ordered);
        let unsorted = TrackSnapshot::from_keyframes(shuffled);
        assert!(!unsorted.is_time_ordered());

        for t in [-1.0, 0.0, 0.5, 1.0, 2.0, 3.0, 9.0] {
            assert_eq!(
                sorted.find_last_at_or_before(t),
                unsorted.find_last_at_or_before(t),
                "last-at-or-before {t}"
            );
            assert_eq!(
                sorted.find_at_or_after(t),
                unsorted.find_at_or_after(t),
                "at-or-after {t}"
            );
        }
    }

    #[test]
    fn test_nan_query_and_nan_timestamps() {
        let store = KeyframeStore::new();
        store.append(kf(0.0, 1.0));
        store.append(kf(f64::NAN, 2.0));
        store.append(kf(1.0, 3.0));

        assert!(store.find_last_at_or_before(f64::NAN).is_none());
        assert_eq!(store.find_last_at_or_before(5.0).unwrap().rect.x, 3.0);
        assert_eq!(store.find_at_or_after(-1.0).unwrap().rect.x, 1.0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_appends() {
        let store = KeyframeStore::new();
        store.append(kf(0.0, 1.0));
        let snapshot = store.all();
        store.append(kf(1.0, 2.0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clear_and_replace() {
        let store = KeyframeStore::from(vec![kf(3.0, 1.0), kf(1.0, 2.0)]);
        store.clear();
        assert!(store.is_empty());
        assert!(store.all().is_time_ordered());

        store.replace(vec![kf(0.0, 7.0)]);
        assert_eq!(store.all().to_vec(), vec![kf(0.0, 7.0)]);
    }

    #[test]
    fn test_concurrent_reader_never_sees_partial_keyframe() {
        let store = Arc::new(KeyframeStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    let v = i as f64;
                    store.append(Keyframe::new(v, CropRect::new(v, v, v, v), 0.5, 1.0));
                }
            })
        };

        let mut observed = 0;
        while observed < 2_000 {
            let snapshot = store.all();
            for k in snapshot.iter() {
                let v = k.timestamp;
                assert_eq!(k.rect, CropRect::new(v, v, v, v));
            }
            if let Some(k) = snapshot.find_last_at_or_before(f64::INFINITY) {
                assert_eq!(k.rect.x, k.timestamp);
            }
            observed = snapshot.len();
        }

        writer.join().unwrap();
        assert!(store.all().is_time_ordered());
    }

    /// Brute-force lookup: the nearest matching timestamp wins and ties go
    /// to the keyframe recorded last.
    fn reference(track: &[Keyframe], t: f64, before: bool) -> Option<Keyframe> {
        let mut best: Option<Keyframe> = None;
        for k in track {
            let matches = if before { k.timestamp <= t } else { k.timestamp >= t };
            let better = match best {
                None => true,
                Some(b) if before => k.timestamp >= b.timestamp,
                Some(b) => k.timestamp <= b.timestamp,
            };
            if matches && better {
                best = Some(*k);
            }
        }
        best
    }

    proptest! {
        #[test]
        fn lookups_match_brute_force(
            steps in prop::collection::vec(0u8..4, 0..24),
            shuffle in any::<bool>(),
            query in -2.0f64..20.0,
        ) {
            // Half-second grid so equal timestamps are common.
            let mut t = 0.0;
            let mut track: Vec<Keyframe> = steps
                .iter()
                .enumerate()
                .map(|(i, step)| {
                    t += f64::from(*step) * 0.5;
                    kf(t, i as f64)
                })
                .collect();
            if shuffle {
                track.reverse();
            }

            let snapshot = TrackSnapshot::from_keyframes(track.clone());
            prop_assert_eq!(
                snapshot.find_last_at_or_before(query).copied(),
                reference(&track, query, true)
            );
            prop_assert_eq!(
                snapshot.find_at_or_after(query).copied(),
                reference(&track, query, false)
            );
        }
    }
}
