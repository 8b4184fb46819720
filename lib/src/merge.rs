use crate::{
    aggregate::{category_grades, Category, GradeTable, TEAM_COL},
    pbp::PbpDf,
    Result,
};
use derive_deref::Deref;
use itertools::{izip, Itertools};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Every grade of one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamGrades {
    pub team: String,
    pub oline: f64,
    pub dline: f64,
    pub secondary: f64,
    pub offense: f64,
}

/// One row per team with a column per category grade.
#[derive(Clone, Deref)]
pub struct GradesDf(DataFrame);

impl GradesDf {
    /// The merged grades as records, ordered by team.
    pub fn records(&self) -> Result<Vec<TeamGrades>> {
        let teams = self.column(TEAM_COL)?.str()?;
        let oline = self.column(&Category::Oline.grade_column())?.f64()?;
        let dline = self.column(&Category::Dline.grade_column())?.f64()?;
        let secondary = self.column(&Category::Secondary.grade_column())?.f64()?;
        let offense = self.column(&Category::Offense.grade_column())?.f64()?;

        let records = izip!(teams, oline, dline, secondary, offense)
            .filter_map(|(team, oline, dline, secondary, offense)| {
                Some(TeamGrades {
                    team: team?.to_string(),
                    oline: oline?,
                    dline: dline?,
                    secondary: secondary?,
                    offense: offense?,
                })
            })
            .collect();
        Ok(records)
    }
}

/// Inner joins the four category tables on team.
///
/// A team missing from any one table is left out of the result.
pub fn merge_grades(
    oline: &GradeTable,
    dline: &GradeTable,
    secondary: &GradeTable,
    offense: &GradeTable,
) -> Result<GradesDf> {
    log::trace!("merge::merge_grades");
    let join_args = JoinArgs::new(JoinType::Inner);
    let merged = oline
        .join(dline, [TEAM_COL], [TEAM_COL], join_args.clone())?
        .join(secondary, [TEAM_COL], [TEAM_COL], join_args.clone())?
        .join(offense, [TEAM_COL], [TEAM_COL], join_args)?
        .sort([TEAM_COL], SortMultipleOptions::default())?;

    let dropped = dropped_teams(&[oline, dline, secondary, offense], &merged)?;
    if !dropped.is_empty() {
        log::warn!(
            "{} teams missing from at least one category: {}",
            dropped.len(),
            dropped.iter().join(", ")
        );
    }

    log::debug!("{} teams with all grades", merged.height());
    Ok(GradesDf(merged))
}

fn team_set(df: &DataFrame) -> Result<BTreeSet<String>> {
    let teams = df
        .column(TEAM_COL)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    Ok(teams)
}

fn dropped_teams(tables: &[&GradeTable], merged: &DataFrame) -> Result<BTreeSet<String>> {
    let kept = team_set(merged)?;
    let mut all = BTreeSet::new();
    for table in tables {
        all.extend(team_set(table)?);
    }
    Ok(all.difference(&kept).cloned().collect())
}

/// Grades every team in `plays` on all categories and merges the results.
pub fn grade_teams(plays: &PbpDf) -> Result<GradesDf> {
    log::trace!("merge::grade_teams");
    log::info!("Grading {} plays", plays.height());

    let oline = category_grades(plays, Category::Oline)?;
    let dline = category_grades(plays, Category::Dline)?;
    let secondary = category_grades(plays, Category::Secondary)?;
    let offense = category_grades(plays, Category::Offense)?;

    let merged = merge_grades(&oline, &dline, &secondary, &offense)?;
    log::info!("Merged grades for {} teams", merged.height());
    Ok(merged)
}
