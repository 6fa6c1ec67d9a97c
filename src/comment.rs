use diesel::Connection as _;
use diesel::prelude::*;

use crate::{
    cafe,
    config::comrak_options,
    db::Connection,
    error::{Error, Result},
    schema::{comments, users},
    user::User,
};

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct Comment {
    /// The unique id of this comment
    pub id: i32,
    /// The user who submitted the comment
    pub author: i32,
    /// The id of the cafe this comment belongs to
    pub cafe: i32,
    /// Day of submission as `YYYY-MM-DD`
    pub date: String,
    /// The comment's content, in markdown
    pub text: String,
}

impl Comment {
    /// The comment's text rendered as HTML
    pub fn formatted(&self) -> String {
        comrak::markdown_to_html(&self.text, &comrak_options())
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "comments"]
pub struct NewComment<'a> {
    pub author: i32,
    pub cafe: i32,
    pub date: &'a str,
    pub text: &'a str,
}

/// Appends a comment to a cafe.
pub fn add(
    connection: &Connection,
    cafe_id: i32,
    author: &User,
    text: &str,
    date: &str,
) -> Result<Comment> {
    use crate::schema::comments::dsl;

    connection.transaction(|| {
        cafe::get(connection, cafe_id)?;
        let new = NewComment {
            author: author.id,
            cafe: cafe_id,
            date,
            text,
        };
        diesel::insert_into(comments::table)
            .values(&new)
            .execute(connection)?;
        dsl::comments
            .filter(dsl::author.eq(author.id))
            .order(dsl::id.desc())
            .first(connection)
            .map_err(Error::from)
    })
}

/// The comments of a cafe in submission order, paired with their author's name.
pub fn list_by_cafe(connection: &Connection, cafe_id: i32) -> Result<Vec<(Comment, String)>> {
    Ok(comments::table
        .inner_join(users::table)
        .filter(comments::cafe.eq(cafe_id))
        .order(comments::id)
        .select((comments::all_columns, users::name))
        .load(connection)?)
}
