//! Fixtures shared by the benchmarks.

/// Boundary used by every multipart fixture under `resources/multipart`.
pub const FORM_BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// A named multipart body, delimited by [`FORM_BOUNDARY`].
#[derive(Debug, Copy, Clone)]
pub struct FormFixture {
    name: &'static str,
    content: &'static str,
}

impl FormFixture {
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    /// The `Content-Type` header announcing this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={FORM_BOUNDARY}")
    }
}
