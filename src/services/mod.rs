pub(crate) mod bulk_import;
pub(crate) mod jalali;
