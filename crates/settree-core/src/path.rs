//! Materialised-path helpers.

/// Lower-case `name` and collapse each run of whitespace into a single `-`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut in_space = false;
  for c in name.chars() {
    if c.is_whitespace() {
      if !in_space {
        slug.push('-');
      }
      in_space = true;
    } else {
      slug.extend(c.to_lowercase());
      in_space = false;
    }
  }
  slug
}

/// The path of a child called `name` under a parent at `parent_path`.
/// A missing or empty parent path yields a root-level path.
pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
  match parent_path {
    Some(parent) if !parent.is_empty() => format!("{parent}.{}", slugify(name)),
    _ => slugify(name),
  }
}
