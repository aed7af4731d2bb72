use std::collections::BTreeSet;

use crate::config::Mode;
use crate::models::category::Category;

/// Pipeline categories a station in `mode` is responsible for.
pub fn active_categories(mode: Mode) -> BTreeSet<Category> {
    match mode {
        Mode::Scanner => BTreeSet::from([Category::Capture]),
        Mode::Processor => BTreeSet::from([Category::Process, Category::Output]),
        Mode::Full => BTreeSet::from(Category::ALL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_only_captures() {
        assert_eq!(
            active_categories(Mode::Scanner).into_iter().collect::<Vec<_>>(),
            vec![Category::Capture]
        );
    }

    #[test]
    fn processor_processes_and_outputs() {
        assert_eq!(
            active_categories(Mode::Processor).into_iter().collect::<Vec<_>>(),
            vec![Category::Process, Category::Output]
        );
    }

    #[test]
    fn full_runs_everything_in_priority_order() {
        assert_eq!(
            active_categories(Mode::Full).into_iter().collect::<Vec<_>>(),
            Category::ALL.to_vec()
        );
    }
}
