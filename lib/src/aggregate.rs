use crate::{filter::PlayFilter, grade, pbp::PbpDf, Result};
use derive_deref::Deref;
use parse_display::Display;
use polars::prelude::*;

/// Name of the team identifier column in every aggregated table.
pub const TEAM_COL: &str = "team";
/// Name of the raw statistic column a category is graded on.
pub const STAT_COL: &str = "stat";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum TeamRole {
    Offense,
    Defense,
}

impl TeamRole {
    pub fn column(self) -> &'static str {
        match self {
            TeamRole::Offense => "posteam",
            TeamRole::Defense => "defteam",
        }
    }
}

/// A graded unit of a team.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Category {
    /// Pressure allowed: sack rate + QB hit rate by offense
    Oline,
    /// Pressure generated: sack rate + QB hit rate by defense
    Dline,
    /// EPA allowed per dropback
    Secondary,
    /// EPA generated per pass or run
    Offense,
}

impl Category {
    pub fn role(self) -> TeamRole {
        match self {
            Category::Oline | Category::Offense => TeamRole::Offense,
            Category::Dline | Category::Secondary => TeamRole::Defense,
        }
    }

    pub fn play_types(self) -> &'static [&'static str] {
        match self {
            Category::Oline | Category::Dline => &[],
            Category::Secondary => &["pass"],
            Category::Offense => &["pass", "run"],
        }
    }

    pub fn filter(self) -> PlayFilter {
        match self.play_types() {
            [] => PlayFilter::new(),
            [play_type] => PlayFilter::new().play_type(play_type),
            play_types => PlayFilter::new().play_types(play_types),
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Category::Oline | Category::Dline => &["sack", "qb_hit"],
            Category::Secondary | Category::Offense => &["epa"],
        }
    }

    /// Whether a lower raw statistic is the better one.
    pub fn inverted(self) -> bool {
        matches!(self, Category::Oline | Category::Secondary)
    }

    fn stat(self) -> Expr {
        match self {
            Category::Oline | Category::Dline => col("sack") + col("qb_hit"),
            Category::Secondary | Category::Offense => col("epa"),
        }
    }

    pub fn grade_column(self) -> String {
        format!("{}_grade", self)
    }
}

/// Averages `columns` over all plays, one row per team in the given role.
///
/// Plays without a team in that role are ignored, as are null values in the
/// averaged columns. The key column is renamed to [`TEAM_COL`] and rows are sorted
/// by it.
pub fn aggregate_means(plays: &DataFrame, role: TeamRole, columns: &[&str]) -> Result<DataFrame> {
    log::trace!("aggregate::aggregate_means {} {:?}", role, columns);
    let key = role.column();

    let means: Vec<Expr> = columns
        .iter()
        .map(|name| col(name).cast(DataType::Float64).mean())
        .collect();

    let df = plays
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key).alias(TEAM_COL)])
        .agg(means)
        .sort([TEAM_COL], SortMultipleOptions::default())
        .collect()?;

    log::debug!("{} teams aggregated by {}", df.height(), key);
    Ok(df)
}

/// Per-team means for a category plus its raw statistic in [`STAT_COL`].
pub fn category_stats(plays: &PbpDf, category: Category) -> Result<DataFrame> {
    log::trace!("aggregate::category_stats {}", category);
    let filtered = plays.clone().filter(category.filter().build())?;
    if !category.play_types().is_empty() {
        log::debug!(
            "{}: {} of {} plays are {}",
            category,
            filtered.height(),
            plays.height(),
            crate::filter::describe_play_types(category.play_types())
        );
    }

    let means = aggregate_means(&filtered, category.role(), category.columns())?;
    let df = means
        .lazy()
        .with_column(category.stat().alias(STAT_COL))
        .collect()?;
    Ok(df)
}

/// Team identifier and grade for one category.
#[derive(Clone, Deref)]
pub struct GradeTable(DataFrame);

impl GradeTable {
    pub(crate) fn new(df: DataFrame) -> Self {
        Self(df)
    }
}

/// Grades every team on `category`.
///
/// Teams whose statistic is null (every averaged value missing) are dropped before
/// normalization, so they fall out of the merged output.
pub fn category_grades(plays: &PbpDf, category: Category) -> Result<GradeTable> {
    let stats = category_stats(plays, category)?;
    let stats = stats.lazy().filter(col(STAT_COL).is_not_null()).collect()?;

    let grade_col = category.grade_column();
    let graded = grade::with_grades(stats, STAT_COL, &grade_col, category.inverted())?;
    let df = graded.select([TEAM_COL, grade_col.as_str()])?;

    log::info!("Graded {} teams on {}", df.height(), category);
    Ok(GradeTable::new(df))
}
