use crate::{ClassMapError, ClassMapResult};

/// RGB colors for 0-based classes 0..16.
pub const DEFAULT_PALETTE: [[u8; 3]; 16] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [0, 255, 255],
    [255, 0, 255],
    [192, 192, 192],
    [128, 128, 128],
    [128, 0, 0],
    [128, 128, 0],
    [0, 128, 0],
    [128, 0, 128],
    [0, 128, 128],
    [0, 0, 128],
    [255, 165, 0],
    [255, 215, 0],
];

/// Class index -> RGB lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<[u8; 3]>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

impl ColorTable {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self { colors }
    }

    /// Profile palette if given, built-in palette otherwise.
    pub fn from_optional(colors: Option<&[[u8; 3]]>) -> Self {
        match colors {
            Some(c) => Self::new(c.to_vec()),
            None => Self::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Every class in `0..classes` must have a color.
    pub fn validate(&self, classes: usize) -> ClassMapResult<()> {
        if self.colors.len() < classes {
            return Err(ClassMapError::TableTooSmall {
                colors: self.colors.len(),
                classes,
            });
        }
        Ok(())
    }

    pub fn get(&self, class: usize) -> Option<[u8; 3]> {
        self.colors.get(class).copied()
    }

    /// Color scaled to `[0, 1]`.
    pub fn unit(&self, class: usize) -> Option<[f32; 3]> {
        self.get(class)
            .map(|[r, g, b]| [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_starts_red_green_blue() {
        let table = ColorTable::default();
        assert_eq!(table.len(), 16);
        assert_eq!(table.unit(0), Some([1.0, 0.0, 0.0]));
        assert_eq!(table.get(2), Some([0, 0, 255]));
        assert_eq!(table.get(16), None);
    }

    #[test]
    fn validate_requires_a_color_per_class() {
        let table = ColorTable::new(vec![[1, 2, 3], [4, 5, 6]]);
        assert!(table.validate(2).is_ok());
        assert!(matches!(
            table.validate(3),
            Err(ClassMapError::TableTooSmall {
                colors: 2,
                classes: 3
            })
        ));
        assert_eq!(ColorTable::from_optional(None), ColorTable::default());
    }
}
