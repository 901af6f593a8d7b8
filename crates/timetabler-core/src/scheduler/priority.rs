//! Processing order for placement.

use std::cmp::Ordering;

use crate::model::Section;

/// Order two sections: larger rosters first, then more blocks, then lower id.
pub fn compare_sections(a: &Section, b: &Section) -> Ordering {
    b.enrolled()
        .cmp(&a.enrolled())
        .then_with(|| b.required_block_count.cmp(&a.required_block_count))
        .then_with(|| a.id.cmp(&b.id))
}

/// Open sections in the order placement should try them.
pub fn prioritize(sections: &[Section]) -> Vec<&Section> {
    let mut open: Vec<&Section> = sections.iter().filter(|s| !s.closed).collect();
    open.sort_by(|a, b| compare_sections(a, b));
    open
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: i64, students: usize, blocks: u32) -> Section {
        Section {
            id,
            code: format!("S{id}"),
            course_code: "C".into(),
            course_title: "Course".into(),
            teacher_id: 1,
            required_block_count: blocks,
            enrolled_student_ids: (0..students as i64).collect(),
            closed: false,
        }
    }

    fn ids(order: &[&Section]) -> Vec<i64> {
        order.iter().map(|s| s.id).collect()
    }

    #[test]
    fn larger_rosters_go_first() {
        let sections = vec![section(1, 5, 1), section(2, 30, 1), section(3, 12, 1)];
        assert_eq!(ids(&prioritize(&sections)), vec![2, 3, 1]);
    }

    #[test]
    fn block_count_breaks_roster_ties() {
        let sections = vec![section(1, 10, 1), section(2, 10, 3), section(3, 10, 2)];
        assert_eq!(ids(&prioritize(&sections)), vec![2, 3, 1]);
    }

    #[test]
    fn id_breaks_remaining_ties() {
        let sections = vec![section(9, 10, 2), section(4, 10, 2), section(7, 10, 2)];
        assert_eq!(ids(&prioritize(&sections)), vec![4, 7, 9]);
    }

    #[test]
    fn closed_sections_are_excluded() {
        let mut closed = section(1, 50, 3);
        closed.closed = true;
        let sections = vec![closed, section(2, 1, 1)];
        assert_eq!(ids(&prioritize(&sections)), vec![2]);
    }
}
