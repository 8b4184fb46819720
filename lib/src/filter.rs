use itertools::Itertools;
use parse_display::{Display, FromStr};
use polars::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, FromStr)]
#[display(style = "UPPERCASE")]
pub enum SeasonType {
    Reg,
    Post,
}

/// Builds a polars filter expression over play-by-play columns.
///
/// Every added condition is combined with the existing ones using AND.
#[derive(Clone, Default)]
pub struct PlayFilter {
    filter_expr: Option<Expr>,
}

impl PlayFilter {
    pub fn new() -> Self {
        Self { filter_expr: None }
    }

    pub fn play_type(self, play_type: &str) -> Self {
        let expr = col("play_type").eq(lit(play_type));
        self.extend_filter(expr)
    }

    // Matches any of the given play types
    pub fn play_types(self, play_types: &[&str]) -> Self {
        let expr = play_types
            .iter()
            .map(|play_type| col("play_type").eq(lit(*play_type)))
            .reduce(|acc, expr| acc.or(expr))
            .unwrap_or_else(|| lit(false));
        self.extend_filter(expr)
    }

    // Week columns come signed or unsigned depending on the source
    pub fn week_range(self, start: u16, end: u16) -> Self {
        let expr = col("week").cast(DataType::Int32).is_between(
            lit(start as i32),
            lit(end as i32),
            ClosedInterval::Both,
        );
        self.extend_filter(expr)
    }

    pub fn season_type(self, season_type: SeasonType) -> Self {
        let expr = col("season_type").eq(lit(season_type.to_string()));
        self.extend_filter(expr)
    }

    pub fn is_empty(&self) -> bool {
        self.filter_expr.is_none()
    }

    fn extend_filter(mut self, new_expr: Expr) -> Self {
        self.filter_expr = match self.filter_expr.take() {
            Some(existing_expr) => Some(existing_expr.and(new_expr)),
            None => Some(new_expr),
        };
        self
    }

    /// Builds the final filter expression. An empty filter keeps every play.
    pub fn build(self) -> Expr {
        self.filter_expr.unwrap_or_else(|| lit(true))
    }
}

pub(crate) fn describe_play_types(play_types: &[&str]) -> String {
    play_types.iter().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plays() -> DataFrame {
        df!(
            "play_type" => &["pass", "run", "punt", "pass", "no_play"],
            "week" => &[1u32, 2, 3, 18, 19],
            "season_type" => &["REG", "REG", "REG", "REG", "POST"],
        )
        .unwrap()
    }

    fn apply(filter: PlayFilter) -> DataFrame {
        plays().lazy().filter(filter.build()).collect().unwrap()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = PlayFilter::new();
        assert!(filter.is_empty());
        assert_eq!(apply(filter).height(), 5);
    }

    #[test]
    fn play_type_matches_exactly() {
        assert_eq!(apply(PlayFilter::new().play_type("pass")).height(), 2);
    }

    #[test]
    fn play_types_are_ored_together() {
        let df = apply(PlayFilter::new().play_types(&["pass", "run"]));
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn conditions_are_anded() {
        let filter = PlayFilter::new()
            .play_types(&["pass", "run"])
            .week_range(2, 18)
            .season_type(SeasonType::Reg);
        assert_eq!(apply(filter).height(), 2);
    }

    #[test]
    fn week_range_accepts_any_integer_week() {
        let filter = || PlayFilter::new().week_range(2, 18).build();
        let unsigned = df!("week" => &[1u32, 2, 18, 19]).unwrap();
        let signed = df!("week" => &[1i64, 2, 18, 19]).unwrap();

        for df in [unsigned, signed] {
            let kept = df.lazy().filter(filter()).collect().unwrap();
            assert_eq!(kept.height(), 2);
        }
    }

    #[test]
    fn season_type_parses_uppercase() {
        assert_eq!("POST".parse::<SeasonType>().unwrap(), SeasonType::Post);
        assert_eq!(SeasonType::Reg.to_string(), "REG");
        assert!("preseason".parse::<SeasonType>().is_err());

        let filter = PlayFilter::new().season_type(SeasonType::Post);
        assert_eq!(apply(filter).height(), 1);
    }

    #[test]
    fn no_play_types_matches_nothing() {
        assert_eq!(apply(PlayFilter::new().play_types(&[])).height(), 0);
    }
}
