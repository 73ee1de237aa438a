use std::{
    ffi::{c_void, CStr, CString},
    fmt,
};

/// A single message captured from libcryptsetup
pub struct LogEntry {
    message: CString,
    previous: Option<Box<LogEntry>>,
}

impl LogEntry {
    /// The message, byte for byte as the library emitted it
    pub fn message(&self) -> &CStr {
        &self.message
    }

    /// The entry captured just before this one
    pub fn previous(&self) -> Option<&LogEntry> {
        self.previous.as_deref()
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogEntry").field(&self.message).finish()
    }
}

/// Messages captured during one instrumented call, newest first.
///
/// The stack is a single nullable pointer to its head entry, so C callers can declare
/// the slot themselves (`cryptlog_logentry *ls = NULL;`) and hand its address to an
/// instrumented call. Every entry is owned by the one in front of it, and dropping the
/// stack releases all of them.
#[repr(transparent)]
#[derive(Default)]
pub struct LogStack {
    head: Option<Box<LogEntry>>,
}

impl LogStack {
    /// Create an empty stack
    pub const fn new() -> Self {
        LogStack { head: None }
    }

    /// Prepend a message, making it the newest entry
    pub fn push(&mut self, message: CString) {
        let previous = self.head.take();
        self.head = Some(Box::new(LogEntry { message, previous }));
    }

    /// Remove and return the newest message
    pub fn pop(&mut self) -> Option<CString> {
        self.head.take().map(|entry| {
            let LogEntry { message, previous } = *entry;
            self.head = previous;
            message
        })
    }

    /// The newest entry
    pub fn head(&self) -> Option<&LogEntry> {
        self.head.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Walk the entries from newest to oldest
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Release every entry, leaving the stack empty
    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }

    /// Consume the stack, returning the messages oldest first with invalid UTF-8 replaced
    pub fn into_chronological(self) -> Vec<String> {
        let mut messages: Vec<String> = self
            .into_iter()
            .map(|m| m.to_string_lossy().into_owned())
            .collect();
        messages.reverse();
        messages
    }

    pub(crate) fn as_context(&mut self) -> *mut c_void {
        (self as *mut LogStack).cast::<c_void>()
    }
}

// Unlinks one node at a time so a long chain can't overflow the stack.
impl Drop for LogStack {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for LogStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over a [`LogStack`], newest first
pub struct Iter<'a> {
    next: Option<&'a LogEntry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CStr;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|entry| {
            self.next = entry.previous();
            entry.message()
        })
    }
}

impl<'a> IntoIterator for &'a LogStack {
    type Item = &'a CStr;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over a [`LogStack`], newest first
pub struct IntoIter(LogStack);

impl Iterator for IntoIter {
    type Item = CString;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop()
    }
}

impl IntoIterator for LogStack {
    type Item = CString;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stack_of(messages: &[&str]) -> LogStack {
        let mut ls = LogStack::new();
        for m in messages {
            ls.push(CString::new(*m).unwrap());
        }
        ls
    }

    #[test]
    fn test_push_prepends() {
        let ls = stack_of(&["first", "second", "third"]);
        let got: Vec<&CStr> = ls.iter().collect();
        assert_eq!(got, vec![c"third", c"second", c"first"]);
        assert_eq!(ls.head().unwrap().message(), c"third");
        assert_eq!(
            ls.head().unwrap().previous().unwrap().message(),
            c"second"
        );
    }

    #[test]
    fn test_empty_stack() {
        let mut ls = LogStack::new();
        assert!(ls.is_empty());
        assert_eq!(ls.len(), 0);
        assert!(ls.head().is_none());
        assert!(ls.pop().is_none());
        ls.clear();
        assert!(ls.into_chronological().is_empty());
    }

    #[test]
    fn test_pop_and_clear() {
        let mut ls = stack_of(&["a", "b"]);
        assert_eq!(ls.len(), 2);
        assert_eq!(ls.pop().unwrap(), CString::new("b").unwrap());
        assert_eq!(ls.len(), 1);
        ls.clear();
        assert!(ls.is_empty());
    }

    #[test]
    fn test_into_chronological() {
        let ls = stack_of(&["Device is too small.\n", "Cannot format device.\n"]);
        assert_eq!(
            ls.into_chronological(),
            vec!["Device is too small.\n", "Cannot format device.\n"]
        );
    }

    #[test]
    fn test_owned_iteration_is_newest_first() {
        let ls = stack_of(&["1", "2", "3"]);
        let got: Vec<CString> = ls.into_iter().collect();
        assert_eq!(
            got,
            vec![
                CString::new("3").unwrap(),
                CString::new("2").unwrap(),
                CString::new("1").unwrap()
            ]
        );
    }

    #[test]
    fn test_drop_long_chain() {
        let mut ls = LogStack::new();
        for _ in 0..200_000 {
            ls.push(CString::new("x").unwrap());
        }
        drop(ls);
    }

    #[test]
    fn test_debug_lists_messages_newest_first() {
        let ls = stack_of(&["older", "newer"]);
        assert_eq!(format!("{:?}", ls), r#"["newer", "older"]"#);
        assert_eq!(format!("{:?}", LogStack::new()), "[]");
        assert_eq!(
            format!("{:?}", ls.head().unwrap()),
            r#"LogEntry("newer")"#
        );
    }

    #[test]
    fn test_slot_is_pointer_sized() {
        assert_eq!(
            std::mem::size_of::<LogStack>(),
            std::mem::size_of::<*mut LogEntry>()
        );
    }
}
