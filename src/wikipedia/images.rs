//! Filtering and relevance ranking of the media files embedded in a page.

/// Filename fragments of files that are never content (UI chrome, icons,
/// maintenance templates, audio, signatures).
pub const SKIP_PATTERNS: &[&str] = &[
    "commons-logo", "wiki", "edit-clear", "symbol_", "pictogram", "ambox", "padlock", "question",
    "crystal", "folder", "gnome", "nuvola", "red_pencil", "disambig", "stub", "portal", "p_vip",
    "star_full", "signature", "autograph", "wma", "ogg", "mid", "octicons", "oojs",
];

/// Filename fragments of images that are real but rarely depict the subject.
pub const GENERIC_PATTERNS: &[&str] = &[
    "map", "flag", "chart", "diagram", "graph", "icon", "location", "coat_of_arms", "emblem", "seal",
];

const RASTER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Tuning values for image ranking and acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageScoring {
    pub token_weight: i32,
    pub exact_name_bonus: i32,
    pub first_last_bonus: i32,
    pub generic_penalty: i32,
    pub min_dimension: u32,
    pub max_dimension: u32,
    /// How many embedded files are enumerated per page.
    pub media_limit: u32,
}

impl Default for ImageScoring {
    fn default() -> Self {
        Self {
            token_weight: 1,
            exact_name_bonus: 5,
            first_last_bonus: 1,
            generic_penalty: 3,
            min_dimension: 100,
            max_dimension: 5000,
            media_limit: 30,
        }
    }
}

impl ImageScoring {
    pub fn accepts_size(&self, width: u32, height: u32) -> bool {
        let range = self.min_dimension..=self.max_dimension;
        range.contains(&width) && range.contains(&height)
    }

    /// Relevance of a file title to `item`; higher is better.
    pub fn score(&self, item: &str, file_title: &str) -> i32 {
        let title = file_title.to_lowercase();
        let tokens: Vec<String> = item.split_whitespace().map(str::to_lowercase).collect();

        let mut score = tokens
            .iter()
            .filter(|token| title.contains(token.as_str()))
            .count() as i32
            * self.token_weight;

        if title.contains(&item.to_lowercase()) {
            score += self.exact_name_bonus;
        }

        // First and last names are the telling parts of a portrait filename.
        if let [first, .., last] = tokens.as_slice() {
            if title.contains(first.as_str()) {
                score += self.first_last_bonus;
            }
            if title.contains(last.as_str()) {
                score += self.first_last_bonus;
            }
        }

        if GENERIC_PATTERNS.iter().any(|pattern| title.contains(pattern)) {
            score -= self.generic_penalty;
        }
        score
    }

    /// Orders acceptable file titles by descending score. Ties keep their
    /// original order.
    pub fn rank<'a>(&self, item: &str, titles: impl IntoIterator<Item = &'a str>) -> Vec<(i32, &'a str)> {
        let mut scored: Vec<(i32, &'a str)> = titles
            .into_iter()
            .filter(|title| is_candidate_title(title))
            .map(|title| (self.score(item, title), title))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
    }
}

/// Whether a media file may be shown at all: no skip-listed fragments, and a
/// raster extension, or SVG only for logos. The extension is the title's
/// suffix, so `X.svg.png` counts as PNG.
pub fn is_candidate_title(file_title: &str) -> bool {
    let title = file_title.to_lowercase();
    if SKIP_PATTERNS.iter().any(|pattern| title.contains(pattern)) {
        return false;
    }
    if RASTER_EXTENSIONS.iter().any(|ext| title.ends_with(ext)) {
        return true;
    }
    title.ends_with(".svg") && title.contains("logo")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_beats_single_token() {
        let scoring = ImageScoring::default();
        let full = scoring.score("Taylor Swift", "File:Taylor Swift 2019.jpg");
        let partial = scoring.score("Taylor Swift", "File:Swift concert.jpg");
        assert!(full > partial, "{full} should exceed {partial}");
        // two tokens, exact name, first and last bonus
        assert_eq!(full, 2 + 5 + 1 + 1);
        assert_eq!(partial, 1 + 1);
    }

    #[test]
    fn generic_filenames_are_penalised() {
        let scoring = ImageScoring::default();
        let plain = scoring.score("Paris", "File:Paris skyline.jpg");
        let generic = scoring.score("Paris", "File:Paris map skyline.jpg");
        assert!(generic < plain);
        assert_eq!(plain - generic, 3);
    }

    #[test]
    fn single_token_names_get_no_first_last_bonus() {
        let scoring = ImageScoring::default();
        assert_eq!(scoring.score("Madonna", "File:Madonna live.jpg"), 1 + 5);
    }

    #[test]
    fn skip_list_and_extensions_filter_titles() {
        assert!(is_candidate_title("File:Queen band 1976.jpg"));
        assert!(is_candidate_title("File:Queen band 1976.JPEG"));
        assert!(is_candidate_title("File:Apple logo black.svg"));
        assert!(!is_candidate_title("File:Generic arrow.svg"));
        assert!(!is_candidate_title("File:Commons-logo.svg"));
        assert!(!is_candidate_title("File:Ambox important.png"));
        assert!(!is_candidate_title("File:Freddie Mercury signature.png"));
        assert!(!is_candidate_title("File:Bohemian Rhapsody sample.ogg"));
        assert!(!is_candidate_title("File:Document.pdf"));
    }

    #[test]
    fn extension_is_read_from_the_end_of_the_title() {
        // A rasterised SVG keeps its inner `.svg` but is served as PNG.
        assert!(is_candidate_title("File:Queen crest.svg.png"));
        assert!(!is_candidate_title("File:Queen photo.jpg.svg"));
        assert!(!is_candidate_title("File:Queen.jpg scan.tiff"));
    }

    #[test]
    fn ranking_is_stable_on_ties() {
        let scoring = ImageScoring::default();
        let ranked = scoring.rank(
            "Queen",
            [
                "File:Stage lights.jpg",
                "File:Queen live.jpg",
                "File:Crowd.jpg",
                "File:Queen flag.png",
                "File:Wikiquote-logo.svg",
            ],
        );
        let titles: Vec<&str> = ranked.iter().map(|(_, title)| *title).collect();
        assert_eq!(
            titles,
            vec![
                "File:Queen live.jpg",
                "File:Queen flag.png",
                "File:Stage lights.jpg",
                "File:Crowd.jpg",
            ]
        );
    }

    #[test]
    fn size_bounds_are_inclusive() {
        let scoring = ImageScoring::default();
        assert!(scoring.accepts_size(100, 5000));
        assert!(!scoring.accepts_size(99, 800));
        assert!(!scoring.accepts_size(800, 5001));
    }
}
