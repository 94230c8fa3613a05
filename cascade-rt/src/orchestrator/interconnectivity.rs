//! Rendering of the model interconnectivity matrix.

// Layer 1: Standard library imports
use std::fmt::Write;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::collection::ModelCollection;

/// Render the publish/subscribe graph as a text matrix: one row per
/// publisher, one numbered column per model, `X` where the row model
/// publishes to the column model.
///
/// ```text
///         |0|1|2|
/// model_a | |X| |
/// model_b | | |X|
/// model_c | | | |
/// ```
pub fn format_matrix(models: &ModelCollection) -> String {
    format_matrix_titled(models, "")
}

pub(crate) fn format_matrix_titled(models: &ModelCollection, title: &str) -> String {
    let first_column_size = models
        .iter()
        .map(|model| model.name.len())
        .chain([title.len()])
        .max()
        .unwrap_or(0);
    let box_size = if models.len() < 11 { 1 } else { 2 };

    let mut out = String::new();
    let _ = write!(out, "{title: <first_column_size$}|");
    for index in 0..models.len() {
        let _ = write!(out, "{index: >box_size$}|");
    }
    for model in models.iter() {
        let _ = write!(out, "\n{: <first_column_size$}|", model.name);
        for column in 0..models.len() {
            let mark = if model.publishes_to.contains(&column) {
                "X"
            } else {
                ""
            };
            let _ = write!(out, "{mark: >box_size$}|");
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_marks_publish_edges() {
        let mut models = ModelCollection::new(["aa", "b"]);
        models.model_mut(0).publishes_to.push(1);
        let matrix = format_matrix(&models);
        let lines: Vec<&str> = matrix.lines().collect();
        assert_eq!(lines[0], "  |0|1|");
        assert_eq!(lines[1], "aa| |X|");
        assert_eq!(lines[2], "b | | |");
    }

    #[test]
    fn test_matrix_widens_columns_past_ten_models() {
        let names: Vec<String> = (0..11).map(|index| format!("m{index}")).collect();
        let models = ModelCollection::new(names);
        let matrix = format_matrix(&models);
        let header = matrix.lines().next().unwrap();
        assert!(header.contains("|10|"));
    }
}
