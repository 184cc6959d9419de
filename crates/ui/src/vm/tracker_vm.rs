use course_core::model::{CompletedSet, ExerciseId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseRowVm {
    pub id: ExerciseId,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerVm {
    pub rows: Vec<ExerciseRowVm>,
    pub completed_count: usize,
}

/// Rows for `exercises`, in the order given.
#[must_use]
pub fn map_tracker(exercises: &[ExerciseId], completed: &CompletedSet) -> TrackerVm {
    let rows: Vec<ExerciseRowVm> = exercises
        .iter()
        .map(|id| ExerciseRowVm {
            id: id.clone(),
            completed: completed.contains(id),
        })
        .collect();
    TrackerVm {
        completed_count: rows.iter().filter(|row| row.completed).count(),
        rows,
    }
}
