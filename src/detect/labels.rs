/// COCO classes counted as animals by box detectors.
pub const COCO_ANIMAL_CLASSES: &[&str] = &[
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
    "mouse", "rabbit",
];

/// Keywords matched against ImageNet labels by whole-frame classifiers.
///
/// ImageNet has hundreds of fine-grained animal classes (dog breeds alone run
/// to dozens), so classifiers match by substring instead of exact name.
pub const IMAGENET_ANIMAL_KEYWORDS: &[&str] = &[
    // dog breeds
    "retriever", "setter", "terrier", "hound", "spaniel", "bulldog", "shepherd", "collie",
    "poodle", "beagle", "boxer", "dalmatian", "chihuahua", "pug",
    // general categories
    "cat", "bird", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "monkey",
    "fish", "lion", "tiger",
    // generic terms
    "animal", "mammal", "canine", "feline", "reptile", "amphibian",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Substring,
}

/// Vocabulary deciding which detector labels count as animals.
#[derive(Clone, Debug)]
pub struct AnimalLabels {
    terms: Vec<String>,
    mode: MatchMode,
}

impl AnimalLabels {
    /// Exact, case-insensitive match against the COCO animal classes.
    pub fn coco() -> Self {
        Self {
            terms: COCO_ANIMAL_CLASSES.iter().map(|s| s.to_string()).collect(),
            mode: MatchMode::Exact,
        }
    }

    /// Substring match against ImageNet animal keywords.
    pub fn imagenet() -> Self {
        Self {
            terms: IMAGENET_ANIMAL_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mode: MatchMode::Substring,
        }
    }

    pub fn is_animal(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        match self.mode {
            MatchMode::Exact => self.terms.iter().any(|t| *t == label),
            MatchMode::Substring => self.terms.iter().any(|t| label.contains(t.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_matches_whole_class_names_only() {
        let labels = AnimalLabels::coco();
        assert!(labels.is_animal("dog"));
        assert!(labels.is_animal("Giraffe"));
        assert!(!labels.is_animal("hotdog"));
        assert!(!labels.is_animal("person"));
    }

    #[test]
    fn imagenet_matches_breed_keywords() {
        let labels = AnimalLabels::imagenet();
        assert!(labels.is_animal("golden retriever"));
        assert!(labels.is_animal("Egyptian cat"));
        assert!(!labels.is_animal("school bus"));
    }
}
