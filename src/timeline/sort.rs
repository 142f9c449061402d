use std::collections::HashSet;

use crate::models::TimelineTask;

/// Order tasks so every dependency is placed before its dependents.
///
/// Each round places all tasks whose dependencies are already placed,
/// ordered by canonical start date (stable for ties). When a round places
/// nothing (a cycle, or a dependency outside this task set) the remaining
/// tasks are appended by start date and the sort ends.
pub fn sort_by_dependencies(tasks: Vec<TimelineTask>) -> Vec<TimelineTask> {
    let mut sorted = Vec::with_capacity(tasks.len());
    let mut placed: HashSet<String> = HashSet::with_capacity(tasks.len());
    let mut remaining = tasks;

    while !remaining.is_empty() {
        let (mut ready, blocked): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|task| task.dependencies.iter().all(|dep| placed.contains(dep)));

        if ready.is_empty() {
            let mut rest = blocked;
            log::warn!(
                "Dependency cycle or dangling reference among {} task(s); ordering them by start date",
                rest.len()
            );
            sort_by_start(&mut rest);
            sorted.extend(rest);
            break;
        }

        sort_by_start(&mut ready);
        placed.extend(ready.iter().map(|task| task.id.clone()));
        sorted.extend(ready);
        remaining = blocked;
    }

    sorted
}

fn sort_by_start(tasks: &mut [TimelineTask]) {
    tasks.sort_by_cached_key(TimelineTask::start_key);
}
