use ulid::Ulid;

use crate::model::{CourseId, Ms, PriorityTier, StudentId, WaitlistEntry};

/// Per-course waitlist, ordered by tier, then `created_at`, then insertion sequence.
///
/// Positions are rewritten after every mutation so callers only ever observe `1..=len`.
#[derive(Debug)]
pub struct WaitlistQueue {
    course_id: CourseId,
    entries: Vec<WaitlistEntry>,
    next_seq: u64,
}

fn order_key(e: &WaitlistEntry) -> (PriorityTier, Ms, u64) {
    (e.tier, e.created_at, e.seq)
}

impl WaitlistQueue {
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in queue order.
    pub fn entries(&self) -> &[WaitlistEntry] {
        &self.entries
    }

    pub fn head(&self) -> Option<&WaitlistEntry> {
        self.entries.first()
    }

    pub fn contains_student(&self, student_id: &str) -> bool {
        self.entries.iter().any(|e| e.student_id == student_id)
    }

    pub fn position_of(&self, student_id: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.student_id == student_id)
            .map(|e| e.position)
    }

    /// Insert behind every entry that outranks it; everything after shifts down by one.
    pub fn enqueue(&mut self, student_id: StudentId, tier: PriorityTier, created_at: Ms) -> WaitlistEntry {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = (tier, created_at, seq);
        let pos = self.entries.partition_point(|e| order_key(e) < key);
        self.entries.insert(
            pos,
            WaitlistEntry {
                id: Ulid::new(),
                student_id,
                course_id: self.course_id.clone(),
                tier,
                position: 0,
                created_at,
                seq,
            },
        );
        self.renumber_from(pos);
        self.entries[pos].clone()
    }

    pub fn dequeue_head(&mut self) -> Option<WaitlistEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let head = self.entries.remove(0);
        self.renumber_from(0);
        Some(head)
    }

    /// Remove by entry id.
    pub fn remove(&mut self, entry_id: Ulid) -> Option<WaitlistEntry> {
        let pos = self.entries.iter().position(|e| e.id == entry_id)?;
        Some(self.remove_at(pos))
    }

    pub fn remove_student(&mut self, student_id: &str) -> Option<WaitlistEntry> {
        let pos = self.entries.iter().position(|e| e.student_id == student_id)?;
        Some(self.remove_at(pos))
    }

    fn remove_at(&mut self, pos: usize) -> WaitlistEntry {
        let entry = self.entries.remove(pos);
        self.renumber_from(pos);
        entry
    }

    fn renumber_from(&mut self, from: usize) {
        for (i, e) in self.entries.iter_mut().enumerate().skip(from) {
            e.position = (i + 1) as u32;
        }
    }
}
