/// Class names of the PPE model, in output index order.
pub const PPE_CLASSES: &[&str] = &[
    "Hardhat",
    "Mask",
    "NO-Hardhat",
    "NO-Mask",
    "NO-Safety Vest",
    "Person",
    "Safety Cone",
    "Safety Vest",
    "machinery",
    "vehicle",
];

pub fn label_for(class_id: usize) -> Option<&'static str> {
    PPE_CLASSES.get(class_id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_lookup() {
        assert_eq!(label_for(2), Some("NO-Hardhat"));
        assert_eq!(label_for(7), Some("Safety Vest"));
        assert_eq!(label_for(PPE_CLASSES.len()), None);
    }
}
