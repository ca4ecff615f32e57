/// The chain of service ids being resolved, innermost first.
#[derive(Clone)]
pub struct ResolveTrace<'a> {
    id: &'a str,
    previous: Option<&'a ResolveTrace<'a>>,
}

impl<'a> ResolveTrace<'a> {
    pub fn new(id: &'a str) -> Self {
        Self { id, previous: None }
    }

    pub fn append<'b>(&'b self, id: &'b str) -> ResolveTrace<'b> {
        ResolveTrace {
            id,
            previous: Some(self),
        }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn previous(&self) -> Option<&ResolveTrace<'a>> {
        self.previous
    }

    pub fn previous_exist_id(&self, id: &str) -> bool {
        let mut this = self;
        while let Some(previous) = this.previous() {
            if previous.id() == id {
                return true;
            }
            this = previous;
        }
        false
    }
}
