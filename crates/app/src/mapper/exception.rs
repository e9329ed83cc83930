//! `Exception` sub-document.

use bson::{Document, doc};
use docsink_domain::ExceptionInfo;

/// Render an exception, unwrapping single-cause aggregates first.
pub fn exception_to_document(exception: &ExceptionInfo) -> Document {
    let exception = exception.normalized();
    let mut document = doc! {
        "Message": exception.message.as_str(),
        "BaseMessage": exception.base_exception().message.as_str(),
        "Type": exception.type_name.as_str(),
        "Text": exception.to_string(),
    };
    if let Some(error_code) = exception.error_code() {
        document.insert("ErrorCode", error_code);
    }
    document.insert("HResult", exception.hresult);
    if let Some(source) = exception.source.as_deref().filter(|source| !source.is_empty()) {
        document.insert("Source", source);
    }
    if let Some(call_site) = exception.call_site.as_ref() {
        document.insert("MethodName", call_site.method_name.as_str());
        if let Some(module_name) = call_site.module_name.as_deref() {
            document.insert("ModuleName", module_name);
        }
        if let Some(module_version) = call_site.module_version.as_deref() {
            document.insert("ModuleVersion", module_version);
        }
    }
    document
}
