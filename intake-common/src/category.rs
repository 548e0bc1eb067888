//! Category schemas and sheet row assembly
//!
//! Each known category maps to one tab of the destination spreadsheet. The
//! schema table in this module is the only place that knows a tab's layout:
//! which column holds the submitter's email, where upload links are spliced
//! into the submitted field list, and what a missing file is written as.
//! It must match the column order of the live spreadsheet.

use std::collections::HashMap;
use std::fmt;

/// Form field selecting the destination tab
pub const SHEET_NAME_FIELD: &str = "sheetName";

/// Form field carrying the submitter's email
pub const EMAIL_FIELD: &str = "email";

/// Confirmation for tabs that have no schema entry
pub const GENERIC_CONFIRMATION: &str = "Form submitted successfully!";

/// Placeholder written for resume/portfolio columns when no file was sent
pub const NO_FILE: &str = "No File";

/// Known submission categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Papers,
    Partners,
    BootcampApplicants,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Papers,
        Category::Partners,
        Category::BootcampApplicants,
    ];

    /// Resolve a `sheetName` form value. Matching is exact.
    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.sheet_name() == name)
    }

    /// Spreadsheet tab name
    pub fn sheet_name(self) -> &'static str {
        match self {
            Category::Papers => "Papers",
            Category::Partners => "Partners",
            Category::BootcampApplicants => "BootcampApplicants",
        }
    }

    pub fn schema(self) -> &'static CategorySchema {
        match self {
            Category::Papers => &PAPERS,
            Category::Partners => &PARTNERS,
            Category::BootcampApplicants => &BOOTCAMP_APPLICANTS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Named file fields a submission may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    PaperFile,
    Supplementary,
    Resume,
    Portfolio,
    Logo,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 5] = [
        AttachmentSlot::PaperFile,
        AttachmentSlot::Supplementary,
        AttachmentSlot::Resume,
        AttachmentSlot::Portfolio,
        AttachmentSlot::Logo,
    ];

    /// Multipart field name used by the submission forms
    ///
    /// `porfolio` is the spelling the deployed forms send.
    pub fn field_name(self) -> &'static str {
        match self {
            AttachmentSlot::PaperFile => "paperFile",
            AttachmentSlot::Supplementary => "supplementary",
            AttachmentSlot::Resume => "resume",
            AttachmentSlot::Portfolio => "porfolio",
            AttachmentSlot::Logo => "logo",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.field_name() == name)
    }

    /// Value written to the sheet when the slot has no file
    pub fn missing_placeholder(self) -> &'static str {
        match self {
            AttachmentSlot::Resume | AttachmentSlot::Portfolio => NO_FILE,
            _ => "",
        }
    }
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Position of an upload link within a category's row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentColumn {
    pub slot: AttachmentSlot,
    /// Insert index into the field list, applied after earlier columns
    pub index: usize,
}

/// Column layout of one spreadsheet tab
#[derive(Debug)]
pub struct CategorySchema {
    pub category: Category,
    /// Column letter holding the submitter's email (header in row 1)
    pub email_column: &'static str,
    /// Upload links in splice order
    pub attachments: &'static [AttachmentColumn],
    /// Message returned after a successful append
    pub confirmation: &'static str,
}

static PAPERS: CategorySchema = CategorySchema {
    category: Category::Papers,
    email_column: "C",
    attachments: &[
        AttachmentColumn {
            slot: AttachmentSlot::PaperFile,
            index: 12,
        },
        AttachmentColumn {
            slot: AttachmentSlot::Supplementary,
            index: 13,
        },
    ],
    confirmation: "Your paper has been submitted for review!",
};

static PARTNERS: CategorySchema = CategorySchema {
    category: Category::Partners,
    email_column: "I",
    attachments: &[AttachmentColumn {
        slot: AttachmentSlot::Logo,
        index: 5,
    }],
    confirmation: "Thank you for your interest in partnering with us! We will be in touch soon.",
};

static BOOTCAMP_APPLICANTS: CategorySchema = CategorySchema {
    category: Category::BootcampApplicants,
    email_column: "C",
    attachments: &[
        AttachmentColumn {
            slot: AttachmentSlot::Resume,
            index: 12,
        },
        AttachmentColumn {
            slot: AttachmentSlot::Portfolio,
            index: 13,
        },
    ],
    confirmation: "Your bootcamp application has been received!",
};

impl CategorySchema {
    /// A1 range covering the email column below the header row
    pub fn email_range(&self) -> String {
        let col = self.email_column;
        a1_range(self.category.sheet_name(), &format!("{col}2:{col}"))
    }

    pub fn uses_slot(&self, slot: AttachmentSlot) -> bool {
        self.attachments.iter().any(|a| a.slot == slot)
    }

    /// Build the row appended to this category's tab.
    ///
    /// `values` are the submitted fields in received order without the
    /// `sheetName` field. Slots absent from `links` get their placeholder.
    pub fn assemble_row(
        &self,
        mut values: Vec<Option<String>>,
        links: &HashMap<AttachmentSlot, String>,
    ) -> Vec<String> {
        for column in self.attachments {
            let link = links
                .get(&column.slot)
                .cloned()
                .unwrap_or_else(|| column.slot.missing_placeholder().to_string());
            splice_at(&mut values, column.index, Some(link));
        }
        sanitize_row(values)
    }
}

/// Confirmation message for a (possibly unknown) category
pub fn confirmation_for(category: Option<Category>) -> &'static str {
    category
        .map(|c| c.schema().confirmation)
        .unwrap_or(GENERIC_CONFIRMATION)
}

/// Insert `value` at `index`, or at the end when the list is shorter.
pub fn splice_at(values: &mut Vec<Option<String>>, index: usize, value: Option<String>) {
    let at = index.min(values.len());
    values.insert(at, value);
}

/// Drop null entries and the literal string `"null"`.
///
/// Empty strings survive: they keep later columns aligned.
pub fn sanitize_row(values: Vec<Option<String>>) -> Vec<String> {
    values
        .into_iter()
        .flatten()
        .filter(|v| v != "null")
        .collect()
}

/// Quote a tab name for use in A1 notation
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("{}!{}", quote_sheet_name(sheet), cells)
}

/// Range used when appending to a tab (header assumed in row 1)
pub fn append_range(sheet: &str) -> String {
    a1_range(sheet, "A2:A")
}

/// Email comparison key: trimmed, ASCII lower-case
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(n: usize) -> Vec<Option<String>> {
        (0..n).map(|i| Some(format!("f{i}"))).collect()
    }

    #[test]
    fn test_from_sheet_name_is_exact() {
        assert_eq!(Category::from_sheet_name("Papers"), Some(Category::Papers));
        assert_eq!(
            Category::from_sheet_name("BootcampApplicants"),
            Some(Category::BootcampApplicants)
        );
        assert_eq!(Category::from_sheet_name("papers"), None);
        assert_eq!(Category::from_sheet_name("Volunteers"), None);
    }

    #[test]
    fn test_email_columns() {
        assert_eq!(Category::Papers.schema().email_column, "C");
        assert_eq!(Category::Partners.schema().email_column, "I");
        assert_eq!(Category::BootcampApplicants.schema().email_column, "C");
        assert_eq!(Category::Partners.schema().email_range(), "'Partners'!I2:I");
    }

    #[test]
    fn test_slot_field_names_round_trip() {
        for slot in AttachmentSlot::ALL {
            assert_eq!(AttachmentSlot::from_field_name(slot.field_name()), Some(slot));
        }
        assert_eq!(AttachmentSlot::from_field_name("portfolio"), None);
    }

    #[test]
    fn test_papers_links_land_at_12_and_13() {
        let mut links = HashMap::new();
        links.insert(AttachmentSlot::PaperFile, "paper-link".to_string());
        links.insert(AttachmentSlot::Supplementary, "supp-link".to_string());

        let row = Category::Papers.schema().assemble_row(fields(15), &links);

        assert_eq!(row.len(), 17);
        assert_eq!(row[11], "f11");
        assert_eq!(row[12], "paper-link");
        assert_eq!(row[13], "supp-link");
        assert_eq!(row[14], "f12");
    }

    #[test]
    fn test_partners_logo_lands_at_5() {
        let mut links = HashMap::new();
        links.insert(AttachmentSlot::Logo, "logo-link".to_string());

        let row = Category::Partners.schema().assemble_row(fields(8), &links);

        assert_eq!(row[4], "f4");
        assert_eq!(row[5], "logo-link");
        assert_eq!(row[6], "f5");
    }

    #[test]
    fn test_missing_files_use_placeholders() {
        let links = HashMap::new();

        let bootcamp = Category::BootcampApplicants.schema().assemble_row(fields(14), &links);
        assert_eq!(bootcamp[12], NO_FILE);
        assert_eq!(bootcamp[13], NO_FILE);

        let papers = Category::Papers.schema().assemble_row(fields(14), &links);
        assert_eq!(papers[12], "");
        assert_eq!(papers[13], "");
    }

    #[test]
    fn test_short_field_list_appends_links() {
        let mut links = HashMap::new();
        links.insert(AttachmentSlot::PaperFile, "p".to_string());
        links.insert(AttachmentSlot::Supplementary, "s".to_string());

        let row = Category::Papers.schema().assemble_row(fields(3), &links);

        assert_eq!(row, vec!["f0", "f1", "f2", "p", "s"]);
    }

    #[test]
    fn test_sanitize_drops_nulls_only() {
        let row = sanitize_row(vec![
            Some("a".to_string()),
            None,
            Some("null".to_string()),
            Some(String::new()),
            Some("NULL".to_string()),
        ]);
        assert_eq!(row, vec!["a", "", "NULL"]);
    }

    #[test]
    fn test_quote_sheet_name_escapes_quotes() {
        assert_eq!(quote_sheet_name("Papers"), "'Papers'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
        assert_eq!(append_range("Papers"), "'Papers'!A2:A");
    }

    #[test]
    fn test_confirmation_messages_differ_per_category() {
        let unknown = confirmation_for(None);
        assert_eq!(unknown, GENERIC_CONFIRMATION);
        for category in Category::ALL {
            assert_ne!(confirmation_for(Some(category)), unknown);
        }
        assert!(confirmation_for(Some(Category::Papers)).contains("review"));
        assert!(confirmation_for(Some(Category::Partners)).contains("partnering"));
        assert!(confirmation_for(Some(Category::BootcampApplicants)).contains("bootcamp"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.ORG "), "ada@example.org");
    }
}
