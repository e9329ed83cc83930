//! Exception payloads carried by log events.

use std::fmt;

/// Result code used when none is supplied (generic failure).
pub const DEFAULT_HRESULT: i32 = -2_146_233_088;

/// Whether the exception originated in managed code or an external API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionKind {
    /// Ordinary in-process error.
    #[default]
    Managed,
    /// Error surfaced by an external/interop boundary, with its native code.
    External {
        /// Native error code reported by the external API.
        error_code: i32,
    },
}

/// Method that raised the exception, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Method name.
    pub method_name: String,
    /// Declaring module, if known.
    pub module_name: Option<String>,
    /// Version of the declaring module, if known.
    pub module_version: Option<String>,
}

impl CallSite {
    /// Call site with only a method name.
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            module_name: None,
            module_version: None,
        }
    }

    /// Attach the module name.
    #[must_use]
    pub fn with_module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    /// Attach the module version.
    #[must_use]
    pub fn with_module_version(mut self, module_version: impl Into<String>) -> Self {
        self.module_version = Some(module_version.into());
        self
    }
}

/// An exception attached to a log event.
///
/// Single-cause exceptions keep their cause in `inner[0]`; aggregates keep
/// every cause in order and set `is_aggregate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Fully qualified type name.
    pub type_name: String,
    /// Exception message.
    pub message: String,
    /// Captured stack trace text.
    pub stack_trace: Option<String>,
    /// Component that raised the exception.
    pub source: Option<String>,
    /// Numeric result code.
    pub hresult: i32,
    /// Managed or external origin.
    pub kind: ExceptionKind,
    /// Raising method, if known.
    pub call_site: Option<CallSite>,
    /// Wrapped causes.
    pub inner: Vec<ExceptionInfo>,
    /// True for exceptions that aggregate several causes.
    pub is_aggregate: bool,
}

impl ExceptionInfo {
    /// Create a managed exception with no cause.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: None,
            source: None,
            hresult: DEFAULT_HRESULT,
            kind: ExceptionKind::Managed,
            call_site: None,
            inner: Vec::new(),
            is_aggregate: false,
        }
    }

    /// Create an aggregate of several causes.
    pub fn aggregate(message: impl Into<String>, causes: Vec<Self>) -> Self {
        Self {
            inner: causes,
            is_aggregate: true,
            ..Self::new("AggregateException", message)
        }
    }

    /// Build from an error and its `source()` chain; each source becomes the
    /// single cause of the one before it.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = vec![Self::new(std::any::type_name::<E>(), error.to_string())];
        let mut current = error.source();
        while let Some(cause) = current {
            chain.push(Self::new(source_type_name(cause), cause.to_string()));
            current = cause.source();
        }

        let mut root: Option<Self> = None;
        while let Some(mut link) = chain.pop() {
            if let Some(cause) = root.take() {
                link.inner.push(cause);
            }
            root = Some(link);
        }
        root.unwrap_or_else(|| Self::new(std::any::type_name::<E>(), error.to_string()))
    }

    /// Attach the stack trace text.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Attach the source component.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Override the result code.
    #[must_use]
    pub const fn with_hresult(mut self, hresult: i32) -> Self {
        self.hresult = hresult;
        self
    }

    /// Mark as external with its native error code.
    #[must_use]
    pub const fn external(mut self, error_code: i32) -> Self {
        self.kind = ExceptionKind::External { error_code };
        self
    }

    /// Attach the raising call site.
    #[must_use]
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    /// Set the single wrapped cause.
    #[must_use]
    pub fn with_inner(mut self, cause: Self) -> Self {
        self.inner = vec![cause];
        self
    }

    /// Copy with nested aggregates collapsed into one level of causes.
    ///
    /// Non-aggregates are returned unchanged.
    #[must_use]
    pub fn flatten(&self) -> Self {
        if !self.is_aggregate {
            return self.clone();
        }
        let mut causes = Vec::new();
        collect_leaf_causes(&self.inner, &mut causes);
        Self {
            inner: causes,
            ..self.clone()
        }
    }

    /// The exception as it should be recorded: aggregates are flattened and,
    /// when exactly one cause remains, replaced by it.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let flattened = self.flatten();
        if flattened.is_aggregate && flattened.inner.len() == 1 {
            if let Some(only) = flattened.inner.into_iter().next() {
                return only;
            }
            return self.clone();
        }
        flattened
    }

    /// Root cause: follows the first cause until reaching an exception with
    /// none, or an aggregate that does not wrap exactly one cause.
    #[must_use]
    pub fn base_exception(&self) -> &Self {
        let mut current = self;
        loop {
            if current.is_aggregate && current.inner.len() != 1 {
                return current;
            }
            match current.inner.first() {
                Some(cause) => current = cause,
                None => return current,
            }
        }
    }

    /// Error code when the exception is external.
    #[must_use]
    pub const fn error_code(&self) -> Option<i32> {
        match self.kind {
            ExceptionKind::External { error_code } => Some(error_code),
            ExceptionKind::Managed => None,
        }
    }

    fn write_header(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.type_name)?;
        if !self.message.is_empty() {
            write!(formatter, ": {}", self.message)?;
        }
        Ok(())
    }
}

fn collect_leaf_causes(causes: &[ExceptionInfo], out: &mut Vec<ExceptionInfo>) {
    for cause in causes {
        if cause.is_aggregate {
            collect_leaf_causes(&cause.inner, out);
        } else {
            out.push(cause.clone());
        }
    }
}

fn source_type_name(error: &(dyn std::error::Error + 'static)) -> &'static str {
    if error.is::<std::io::Error>() {
        "std::io::Error"
    } else {
        "std::error::Error"
    }
}

impl fmt::Display for ExceptionInfo {
    /// Full diagnostic text: header, causes, then the stack trace.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(formatter)?;
        if self.is_aggregate {
            for (index, cause) in self.inner.iter().enumerate() {
                write!(formatter, "\n ---> (Inner Exception #{index}) {cause}<---")?;
            }
        } else if let Some(cause) = self.inner.first() {
            write!(
                formatter,
                " ---> {cause}\n   --- End of inner exception stack trace ---"
            )?;
        }
        if let Some(stack_trace) = self.stack_trace.as_deref().filter(|text| !text.is_empty()) {
            write!(formatter, "\n{stack_trace}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cause_aggregate_normalizes_to_the_cause() {
        let cause = ExceptionInfo::new("TimeoutException", "slow");
        let nested = ExceptionInfo::aggregate(
            "outer",
            vec![ExceptionInfo::aggregate("inner", vec![cause.clone()])],
        );
        assert_eq!(nested.normalized(), cause);
    }

    #[test]
    fn multi_cause_aggregate_is_flattened_and_kept() {
        let first = ExceptionInfo::new("A", "one");
        let second = ExceptionInfo::new("B", "two");
        let nested = ExceptionInfo::aggregate(
            "outer",
            vec![
                first.clone(),
                ExceptionInfo::aggregate("inner", vec![second.clone()]),
            ],
        );
        let normalized = nested.normalized();
        assert!(normalized.is_aggregate);
        assert_eq!(normalized.inner, vec![first, second]);
    }

    #[test]
    fn base_exception_follows_single_causes() {
        let root = ExceptionInfo::new("IOException", "disk");
        let wrapped = ExceptionInfo::new("InvalidOperationException", "failed")
            .with_inner(ExceptionInfo::new("Wrapper", "mid").with_inner(root.clone()));
        assert_eq!(wrapped.base_exception(), &root);

        let multi = ExceptionInfo::aggregate("many", vec![root.clone(), root]);
        assert!(multi.base_exception().is_aggregate);
    }

    #[test]
    fn text_includes_causes_and_stack_trace() {
        let exception = ExceptionInfo::new("InvalidOperationException", "failed")
            .with_inner(ExceptionInfo::new("IOException", "disk"))
            .with_stack_trace("   at Worker.Run()");
        assert_eq!(
            exception.to_string(),
            "InvalidOperationException: failed ---> IOException: disk\n   --- End of inner exception stack trace ---\n   at Worker.Run()"
        );
    }

    #[test]
    fn from_error_walks_the_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);

        impl fmt::Display for Outer {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("write failed")
            }
        }

        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let error = Outer(std::io::Error::other("disk full"));
        let info = ExceptionInfo::from_error(&error);
        assert_eq!(info.message, "write failed");
        assert!(info.type_name.ends_with("Outer"));
        assert_eq!(info.base_exception().message, "disk full");
        assert_eq!(info.base_exception().type_name, "std::io::Error");
    }
}
