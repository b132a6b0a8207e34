use std::path::Path;

use crate::{ColumnKind, QuantRow};

/// Helper function to check extensions in filenames
pub(crate) fn check_extension(filename: impl AsRef<Path>, extension: impl AsRef<Path>) -> bool {
    filename
        .as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.as_ref()))
}

/// Sum every column over the given rows, missing values count as zero.
pub(crate) fn column_sums<'a>(
    rows: impl Iterator<Item = &'a QuantRow>,
    kind: ColumnKind,
    width: usize,
) -> Vec<f64> {
    let mut sums = vec![0.0; width];
    for row in rows {
        for (sum, value) in sums.iter_mut().zip(row.values(kind)) {
            *sum += value.unwrap_or_default();
        }
    }
    sums
}

/// The mean of every column over the given rows, missing values count as zero. Without any rows
/// all means are NaN.
pub(crate) fn column_means<'a>(
    rows: impl ExactSizeIterator<Item = &'a QuantRow>,
    kind: ColumnKind,
    width: usize,
) -> Vec<f64> {
    let n = rows.len() as f64;
    column_sums(rows, kind, width)
        .into_iter()
        .map(|sum| sum / n)
        .collect()
}

/// Count per column the number of rows with a nonzero value, missing values count as zero.
pub(crate) fn column_nonzero_counts<'a>(
    rows: impl Iterator<Item = &'a QuantRow>,
    kind: ColumnKind,
    width: usize,
) -> Vec<usize> {
    let mut counts = vec![0; width];
    for row in rows {
        for (count, value) in counts.iter_mut().zip(row.values(kind)) {
            if value.unwrap_or_default() != 0.0 {
                *count += 1;
            }
        }
    }
    counts
}

/// The mean of the present values in an iterator, `None` if there are no values.
pub(crate) fn mean_of_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
