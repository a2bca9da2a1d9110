use bstr::{BStr, BString};

use rivet_collections::RbTree;

use super::{FileId, MemberId};

/// A member of an archive: a byte range that may later be materialized
/// into an object file.
#[derive(Debug)]
pub struct Member {
    /// Member name, if the archive records one.
    pub name: Option<BString>,
    /// Offset of the member contents within the archive.
    pub data_offset: usize,
    /// Size of the member contents.
    pub size: usize,
    /// The object file this member was materialized into. Set at most
    /// once, never cleared.
    pub object: Option<FileId>,
}

/// A parsed archive: its members and the ranlib symbol index mapping
/// defined symbol names to members.
#[derive(Debug)]
pub struct Archive<'a> {
    /// Display name.
    pub name: String,
    /// The whole archive, borrowed from the input blob.
    pub data: &'a [u8],
    /// All regular members.
    pub members: Vec<Member>,
    /// `symbol name → member` from the ranlib index. Duplicate names
    /// keep the first entry.
    pub index: RbTree<BString, MemberId>,
}

impl<'a> Archive<'a> {
    /// The member defining `symbol`, according to the ranlib index.
    pub fn find_symbol(&self, symbol: &BStr) -> Option<MemberId> {
        self.index.get(symbol).copied()
    }

    /// Access a member.
    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.index()]
    }

    /// Access a member, mutably.
    pub fn member_mut(&mut self, id: MemberId) -> &mut Member {
        &mut self.members[id.index()]
    }

    /// The raw contents of a member.
    ///
    /// The slice borrows from the archive blob, not from `self`, so it
    /// stays valid while the context is mutated.
    pub fn member_bytes(&self, id: MemberId) -> &'a [u8] {
        let member = self.member(id);

        &self.data[member.data_offset..member.data_offset + member.size]
    }

    /// The display name of a member, `libx.a(member.o)` style.
    pub fn member_display_name(&self, id: MemberId) -> String {
        match &self.member(id).name {
            Some(member_name) => format!("{}({})", self.name, member_name),
            None => format!("{}(#{})", self.name, id.index()),
        }
    }
}
