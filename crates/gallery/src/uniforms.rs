use std::collections::BTreeMap;

/// Value stored in a uniform cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

/// A boxed uniform slot; hooks overwrite `value` in place every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub value: UniformValue,
}

impl Uniform {
    pub fn new(value: UniformValue) -> Self {
        Self { value }
    }
}

/// Uniform name to cell mapping owned by the active material.
///
/// A fresh map is produced by the registry for every activation and dropped
/// when the shader is switched away from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformMap {
    cells: BTreeMap<String, Uniform>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by the registry factories.
    pub fn with(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: UniformValue) {
        self.cells.insert(name.into(), Uniform::new(value));
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.cells.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.cells.get_mut(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)?.value {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn vec2(&self, name: &str) -> Option<[f32; 2]> {
        match self.get(name)?.value {
            UniformValue::Vec2(value) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }
}
