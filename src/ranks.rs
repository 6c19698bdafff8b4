use crate::models::Rank;

/// Highest rank whose threshold the counter has reached. Falls back to the
/// lowest rank so a user always has one.
pub fn rank_for(checkins: i64, table: &[Rank]) -> Option<&Rank> {
    table
        .iter()
        .filter(|rank| rank.min_checkins <= checkins)
        .max_by_key(|rank| rank.min_checkins)
        .or_else(|| table.iter().min_by_key(|rank| rank.min_checkins))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NextRank<'a> {
    pub rank: &'a Rank,
    pub remaining: i64,
}

pub fn next_rank(checkins: i64, table: &[Rank]) -> Option<NextRank<'_>> {
    table
        .iter()
        .filter(|rank| rank.min_checkins > checkins)
        .min_by_key(|rank| rank.min_checkins)
        .map(|rank| NextRank {
            rank,
            remaining: rank.min_checkins - checkins,
        })
}

pub fn format_rank_table(table: &[Rank]) -> String {
    let mut sorted: Vec<&Rank> = table.iter().collect();
    sorted.sort_by_key(|rank| rank.min_checkins);
    sorted
        .iter()
        .map(|rank| {
            format!(
                "{} <b>{}</b> from {} check-ins",
                rank.emoji,
                crate::utils::escape_html(&rank.name),
                rank.min_checkins
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Rank> {
        vec![
            Rank::new("Reformer", 15, "🔥"),
            Rank::new("Newcomer", 0, "🌱"),
            Rank::new("Philosopher", 30, "🧠"),
            Rank::new("Ideologist", 5, "💡"),
        ]
    }

    #[test]
    fn test_rank_for_thresholds() {
        let table = table();
        assert_eq!(rank_for(0, &table).unwrap().name, "Newcomer");
        assert_eq!(rank_for(4, &table).unwrap().name, "Newcomer");
        assert_eq!(rank_for(5, &table).unwrap().name, "Ideologist");
        assert_eq!(rank_for(14, &table).unwrap().name, "Ideologist");
        assert_eq!(rank_for(15, &table).unwrap().name, "Reformer");
        assert_eq!(rank_for(1000, &table).unwrap().name, "Philosopher");
    }

    #[test]
    fn test_rank_for_falls_back_to_lowest() {
        let table = vec![Rank::new("Senior", 3, "⭐"), Rank::new("Elder", 10, "⭐")];
        assert_eq!(rank_for(1, &table).unwrap().name, "Senior");
        assert!(rank_for(1, &[]).is_none());
    }

    #[test]
    fn test_next_rank() {
        let table = table();
        let next = next_rank(3, &table).unwrap();
        assert_eq!(next.rank.name, "Ideologist");
        assert_eq!(next.remaining, 2);

        let next = next_rank(5, &table).unwrap();
        assert_eq!(next.rank.name, "Reformer");
        assert_eq!(next.remaining, 10);

        assert!(next_rank(30, &table).is_none());
    }

    #[test]
    fn test_format_rank_table_is_sorted() {
        let text = format_rank_table(&table());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Newcomer"));
        assert!(lines[3].contains("Philosopher"));
    }
}
