use crate::{ErrorCode, QuarryError};

impl From<std::io::Error> for QuarryError {
    fn from(err: std::io::Error) -> Self {
        QuarryError::new(ErrorCode::InternalPanic, err.to_string())
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        QuarryError::new(ErrorCode::SerializationFailed, err.to_string())
    }
}

impl From<serde_yaml::Error> for QuarryError {
    fn from(err: serde_yaml::Error) -> Self {
        QuarryError::new(ErrorCode::InvalidConfig, err.to_string())
    }
}

/// Levenshtein-based suggestion used for "Did you mean ...?" hints.
///
/// Returns the closest option within an edit distance of 3, comparing case-insensitively.
pub fn closest_match<S: AsRef<str>>(target: &str, options: &[S]) -> Option<String> {
    let target = target.to_lowercase();
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let option = option.as_ref();
        let distance = levenshtein(&target, &option.to_lowercase());
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option);
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in dp[0].iter_mut().enumerate() {
        *val = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = std::cmp::min(
                std::cmp::min(dp[i - 1][j] + 1, dp[i][j - 1] + 1),
                dp[i - 1][j - 1] + cost,
            );
        }
    }

    dp[a.len()][b.len()]
}
