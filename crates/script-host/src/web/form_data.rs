//! `FormData` (spec 4.G): like `Headers` but without case-folding — an
//! ordered multimap of `(name, value)` string pairs.

/// Ordered multimap backing `FormData`.
#[derive(Default)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_owned(), value.to_owned()));
    }

    pub fn set(&mut self, name: &str, value: &str) {
        let mut replaced = false;
        self.entries.retain_mut(|(n, v)| {
            if n == name {
                if replaced {
                    return false;
                }
                *v = value.to_owned();
                replaced = true;
            }
            true
        });
        if !replaced {
            self.entries.push((name.to_owned(), value.to_owned()));
        }
    }

    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries.iter().filter(|(n, _)| n == name).map(|(_, v)| v.as_str()).collect()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}
