//! Part-number to dense-index map.
//!
//! Part numbers from the geometry file are arbitrary (and usually small)
//! integers; this is a small separate-chaining table rather than the
//! open-addressed [`crate::data::face_map::FaceMap`] because collisions are
//! rare and deletions (used when a case reloads a part) are common.

const DEFAULT_BUCKETS: usize = 1024;

#[derive(Debug, Clone)]
pub struct PartNumberMap {
    buckets: Vec<Vec<(i32, u32)>>,
}

impl Default for PartNumberMap {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUCKETS)
    }
}

impl PartNumberMap {
    pub fn with_capacity(buckets: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); buckets.max(1)],
        }
    }

    fn bucket_index(&self, part_number: i32) -> usize {
        (part_number as i64).rem_euclid(self.buckets.len() as i64) as usize
    }

    /// Insert, overwriting any existing dense index for this part number.
    pub fn insert(&mut self, part_number: i32, dense_index: u32) {
        let idx = self.bucket_index(part_number);
        let bucket = &mut self.buckets[idx];
        if let Some(entry) = bucket.iter_mut().find(|(k, _)| *k == part_number) {
            entry.1 = dense_index;
        } else {
            bucket.push((part_number, dense_index));
        }
    }

    pub fn get(&self, part_number: i32) -> Option<u32> {
        let idx = self.bucket_index(part_number);
        self.buckets[idx]
            .iter()
            .find(|(k, _)| *k == part_number)
            .map(|(_, v)| *v)
    }

    pub fn remove(&mut self, part_number: i32) -> Option<u32> {
        let idx = self.bucket_index(part_number);
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|(k, _)| *k == part_number)?;
        Some(bucket.swap_remove(pos).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut m = PartNumberMap::default();
        m.insert(1, 0);
        m.insert(7, 1);
        m.insert(1_000_000, 2);
        assert_eq!(m.get(1), Some(0));
        assert_eq!(m.get(7), Some(1));
        assert_eq!(m.get(1_000_000), Some(2));
        assert_eq!(m.get(42), None);
    }

    #[test]
    fn insert_overwrites() {
        let mut m = PartNumberMap::default();
        m.insert(5, 0);
        m.insert(5, 9);
        assert_eq!(m.get(5), Some(9));
    }

    #[test]
    fn remove_drops_entry() {
        let mut m = PartNumberMap::default();
        m.insert(3, 0);
        assert_eq!(m.remove(3), Some(0));
        assert_eq!(m.get(3), None);
        assert_eq!(m.remove(3), None);
    }

    #[test]
    fn collisions_in_same_bucket_coexist() {
        let mut m = PartNumberMap::with_capacity(4);
        m.insert(1, 10);
        m.insert(5, 50); // same bucket as 1 (5 % 4 == 1)
        assert_eq!(m.get(1), Some(10));
        assert_eq!(m.get(5), Some(50));
    }
}
