//! The System-V `ar` archive front-end.
//!
//! One walk over the member headers collects the regular members, the
//! ranlib symbol index and the long-names table; the index is then
//! decoded into the `symbol name → member` map that drives demand
//! loading. An archive without a ranlib index is rejected — searching
//! members one by one is not supported.

use bstr::BString;

use rivet_collections::RbTree;
use rivet_object::ar::{self, long_name_at, ranlib_entries, MemberName};

use crate::{
    frontend::ArchiveFrontend,
    ir::{Archive, Member, MemberId},
    Context, Error,
};

/// The System-V archive front-end.
pub struct ArFrontend;

impl ArchiveFrontend for ArFrontend {
    fn name(&self) -> &'static str {
        "ar"
    }

    fn probe(&self, bytes: &[u8]) -> bool {
        ar::probe(bytes)
    }

    fn parse<'a>(
        &self,
        ctx: &mut Context<'a>,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<usize, Error> {
        let reporter = ctx.reporter.clone();
        let malformed = |detail: &str| Error::Malformed {
            file: name.to_string(),
            detail: detail.to_string(),
        };

        let walker = ar::members::<()>(bytes).ok_or_else(|| malformed("missing archive magic"))?;

        let mut members: Vec<Member> = Vec::new();
        // Ranlib entries point at member headers by archive offset.
        let mut members_by_offset: RbTree<u64, MemberId> = RbTree::new();
        let mut ranlib: Option<&[u8]> = None;
        let mut long_names: Option<&[u8]> = None;
        let mut pending_long_name_refs: Vec<(MemberId, u64)> = Vec::new();

        for member in walker {
            let member = member.map_err(|_| malformed("corrupt archive member header"))?;

            reporter.trace(format_args!(
                "member at offset {:#x}, {} byte(s)",
                member.header_offset,
                member.data.len()
            ));

            let member_name = match member.header.name() {
                MemberName::RanlibIndex => {
                    if ranlib.is_some() {
                        reporter.warning("duplicate symbol index, the last one wins");
                    }
                    ranlib = Some(member.data);
                    continue;
                }

                MemberName::LongNames => {
                    long_names = Some(member.data);
                    continue;
                }

                MemberName::Sym64 => {
                    return Err(malformed("the 64-bit archive symbol index is not supported"));
                }

                MemberName::Bsd => {
                    return Err(malformed("BSD-style archives are not supported"));
                }

                MemberName::LongNameRef(offset) => {
                    // Resolved after the walk; "//" usually precedes
                    // the members referring to it, but nothing
                    // guarantees that.
                    pending_long_name_refs.push((MemberId::new(members.len()), offset));
                    None
                }

                MemberName::Plain(member_name) if member_name.is_empty() => None,
                MemberName::Plain(member_name) => Some(BString::from(member_name)),
            };

            members_by_offset.insert(member.header_offset, MemberId::new(members.len()));
            members.push(Member {
                name: member_name,
                data_offset: member.header_offset as usize + ar::MemberHeader::SIZE,
                size: member.data.len(),
                object: None,
            });
        }

        for (member_id, offset) in pending_long_name_refs {
            match long_names.and_then(|table| long_name_at(table, offset)) {
                Some(resolved) => members[member_id.index()].name = Some(BString::from(resolved)),
                None => reporter.warning(format_args!(
                    "member name at long-names offset {offset} cannot be resolved"
                )),
            }
        }

        let ranlib = ranlib.ok_or_else(|| malformed("archive has no symbol index"))?;
        let entries =
            ranlib_entries::<()>(ranlib).map_err(|_| malformed("corrupt symbol index"))?;

        let mut index: RbTree<BString, MemberId> = RbTree::new();
        for (symbol, offset) in entries {
            let Some(&member_id) = members_by_offset.get(&offset) else {
                reporter.warning(format_args!(
                    "symbol index entry `{symbol}` points at no member, ignored"
                ));
                continue;
            };

            // Duplicate names keep the first entry, like `ar` orders
            // them.
            if !index.contains_key(symbol) {
                index.insert(BString::from(symbol), member_id);
            }
        }

        reporter.trace(format_args!(
            "attached archive with {} member(s), {} indexed symbol(s)",
            members.len(),
            index.len()
        ));

        ctx.archives.push(Archive { name: name.to_string(), data: bytes, members, index });

        Ok(ctx.archives.len() - 1)
    }
}
