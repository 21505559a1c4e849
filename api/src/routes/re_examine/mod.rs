pub mod re_examine_request;
pub mod re_examine_route;
