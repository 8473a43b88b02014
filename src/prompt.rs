use std::borrow::Cow;

/// Question-answering template installed on every query engine.
pub const QA_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the context information above I want you to think step by step to answer the query in a crisp manner, \
incase you don't know the answer say 'I don't know!'.\n\
Query: {query_str}\n\
Answer: ";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: Cow<'static, str>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn qa() -> Self {
        Self::new(QA_TEMPLATE)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Fills `{context_str}` and `{query_str}` in a single pass, so
    /// placeholder-like text inside the substituted values stays literal.
    pub fn format(&self, context_str: &str, query_str: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context_str.len() + query_str.len());
        let mut rest: &str = &self.template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{context_str}") {
                out.push_str(context_str);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{query_str}") {
                out.push_str(query_str);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::qa()
    }
}
