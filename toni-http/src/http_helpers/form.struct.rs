use super::StringValues;

/// A file section of a `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFile {
    /// Field name from `Content-Disposition`.
    pub name: String,
    /// Client supplied file name; may be empty.
    pub filename: String,
    /// Section `Content-Type`, when the client sent one.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Parsed request form: plain fields plus any uploaded files.
///
/// File sections never show up among the string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormCollection {
    fields: StringValues,
    files: Vec<FormFile>,
}

impl FormCollection {
    pub fn new(fields: StringValues, files: Vec<FormFile>) -> Self {
        Self { fields, files }
    }

    pub fn fields(&self) -> &StringValues {
        &self.fields
    }

    pub fn files(&self) -> &[FormFile] {
        &self.files
    }

    /// First uploaded file for field `name`.
    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// First value of field `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields.get_all(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }
}
