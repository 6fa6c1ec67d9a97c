table! {
    cafes (id) {
        id -> Integer,
        name -> Text,
        author -> Nullable<Integer>,
        map_url -> Text,
        img_url -> Text,
        location -> Text,
        seats -> Text,
        has_toilet -> Bool,
        has_wifi -> Bool,
        has_sockets -> Bool,
        can_take_calls -> Bool,
        coffee_price -> Nullable<Text>,
    }
}

table! {
    comments (id) {
        id -> Integer,
        author -> Integer,
        cafe -> Integer,
        date -> Text,
        text -> Text,
    }
}

table! {
    sessions (id) {
        id -> Text,
        user_id -> Integer,
        expires -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Integer,
        email -> Text,
        hash -> Text,
        salt -> Binary,
        name -> Text,
        role -> crate::user::RoleMapping,
    }
}

joinable!(comments -> cafes (cafe));
joinable!(comments -> users (author));
joinable!(sessions -> users (user_id));

allow_tables_to_appear_in_same_query!(cafes, comments, sessions, users,);
