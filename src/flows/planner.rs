//! Goal planning: a flow that turns a goal into dated milestones, the
//! date remap that keeps model output anchored to the calendar, and
//! the batch that materializes a plan as notes.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Flow;
use crate::error::{MemoWeaveError, Result};
use crate::note::Note;
use crate::storage::{NoteStore, WriteBatch};

const MIN_MILESTONES: u32 = 2;
const MAX_MILESTONES: u32 = 12;

#[derive(Debug, Clone, Serialize)]
pub struct PlanInput {
    pub goal: String,
    /// Language for milestone text; the backend default applies when
    /// unset.
    pub language: Option<String>,
    /// Requested milestone count, 2 to 12.
    pub milestone_count: Option<u32>,
    /// Anchors the model's dates; also the base for the remap.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Milestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// "YYYY-MM-DD" as produced by the model; remapped before use.
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanOutput {
    pub milestones: Vec<Milestone>,
}

pub struct GoalPlanFlow;

#[async_trait]
impl Flow for GoalPlanFlow {
    type Input = PlanInput;
    type Output = PlanOutput;

    fn name(&self) -> &'static str {
        "plan"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        if input.goal.trim().is_empty() {
            return Err(MemoWeaveError::invalid("goal", "(empty)"));
        }
        if let Some(count) = input.milestone_count {
            if !(MIN_MILESTONES..=MAX_MILESTONES).contains(&count) {
                return Err(MemoWeaveError::invalid("milestones", count.to_string()));
            }
        }
        Ok(())
    }

    fn system(&self) -> String {
        "You break goals into ordered, concrete milestones. Each milestone \
         has a short title, one or two sentences of description, and a \
         YYYY-MM-DD due date. Space the dates realistically, earliest \
         first."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        let mut prompt = format!(
            "Today is {}. Plan this goal:\n\n{}",
            input.today.format("%Y-%m-%d"),
            input.goal
        );
        match input.milestone_count {
            Some(count) => prompt.push_str(&format!("\n\nProduce exactly {} milestones.", count)),
            None => prompt.push_str("\n\nProduce between 4 and 8 milestones."),
        }
        if let Some(language) = &input.language {
            prompt.push_str(&format!(" Write in {}.", language));
        }
        prompt
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        if output.milestones.is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(output)
    }
}

/// Anchor model dates to the calendar. When the first date is not in
/// the future the whole chain is rebased to start tomorrow, keeping
/// each relative gap but never less than one day between milestones.
pub fn remap_due_dates(milestones: &[Milestone], today: NaiveDate) -> Result<Vec<NaiveDate>> {
    let parsed = milestones
        .iter()
        .map(|m| {
            NaiveDate::parse_from_str(m.due_date.trim(), "%Y-%m-%d")
                .map_err(|_| MemoWeaveError::FlowOutputRejected { flow: "plan" })
        })
        .collect::<Result<Vec<NaiveDate>>>()?;

    let Some(first) = parsed.first() else {
        return Ok(parsed);
    };
    if *first > today {
        return Ok(parsed);
    }

    let mut previous = today + Duration::days(1);
    let mut remapped = vec![previous];
    for window in parsed.windows(2) {
        let gap = (window[1] - window[0]).num_days().max(1);
        previous = previous + Duration::days(gap);
        remapped.push(previous);
    }
    Ok(remapped)
}

/// Write a plan as notes in one atomic batch: fresh shared plan id,
/// the goal on every member, sequential order after the current
/// maximum.
pub fn materialize_plan(
    store: &NoteStore,
    goal: &str,
    milestones: &[Milestone],
    due_dates: &[NaiveDate],
) -> Result<Vec<Note>> {
    let plan_id = Uuid::new_v4();
    let base_order = store.next_order()?;

    let notes: Vec<Note> = milestones
        .iter()
        .zip(due_dates)
        .enumerate()
        .map(|(i, (milestone, due))| {
            let mut note = Note::new(milestone.title.clone());
            note.content = milestone.description.clone();
            note.due_date = Some(*due);
            note.plan_id = Some(plan_id);
            note.plan_goal = Some(goal.to_string());
            note.order = base_order + i as i64;
            note
        })
        .collect();

    let mut batch = WriteBatch::new();
    for note in &notes {
        batch.put(note.clone());
    }
    store.apply_batch(batch)?;
    Ok(notes)
}
