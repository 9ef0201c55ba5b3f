// In many cases, we need to do a let binding to satisfy the borrow checker
// and for some reason, clippy identifies those as unnecessary. Maybe there
// are and clippy knows more than me, maybe not.
#![allow(clippy::let_and_return)]

use super::{models, procedures::Procedures, view::TodoList};
use ammonia::{clean, clean_text};
use std::fmt::Write;

const HTMX_SRC: &str = "https://unpkg.com/htmx.org@1.9.6";

const STYLE: &str = r#"
    main { max-width: 48rem; margin: 1.25rem auto; font-family: sans-serif; }
    .todos { margin: 1.25rem 0; font-size: 1.875rem; }
    .todo { display: flex; gap: 0.75rem; align-items: center; }
    .todo input { zoom: 1.5; }
    .add { display: flex; justify-content: space-between; }
    .add input { border: 1px solid black; }
    .add button { background: black; color: white; padding: 0.5rem; border-radius: 0.5rem; }
"#;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

pub struct Page<'a> {
    pub title: &'a str,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
            <html>
                <head>
                    <meta name="viewport" content="width=device-width, initial-scale=1.0"></meta>
                    <title>{title}</title>
                    <style>{STYLE}</style>
                </head>
                <body>
                    <main>
                        {body_html}
                    </main>
                    <script src="{HTMX_SRC}"></script>
                    <script>
                        htmx.config.defaultSwapStyle = "outerHTML"
                    </script>
                </body>
            </html>
            "#,
            title = clean(self.title),
            body_html = self.children.render()
        )
    }
}

pub struct Item<'a> {
    pub todo: &'a models::Todo,
}
impl Component for Item<'_> {
    fn render(&self) -> String {
        let id = self.todo.id;
        let checked_state = if self.todo.done.is_complete() {
            "checked"
        } else {
            ""
        };
        let next = self.todo.done.flipped();
        format!(
            r##"
            <div class="todo">
                <input
                    id="check-{id}"
                    type="checkbox" {checked_state}
                    hx-post="/todos/{id}/done"
                    hx-vals='{{"done": "{next}"}}'
                    hx-target="#todo-list"
                />
                <label for="check-{id}">{content}</label>
            </div>
            "##,
            content = clean(&self.todo.content),
        )
    }
}

/// The whole list plus the input form; this is the unit htmx swaps after
/// every mutation.
pub struct TodoListView<'a> {
    pub todos: &'a [models::Todo],
    pub content: &'a str,
}

impl<'a> TodoListView<'a> {
    pub fn of<P: Procedures>(list: &'a TodoList<P>) -> Self {
        TodoListView {
            todos: list.todos(),
            content: list.content(),
        }
    }
}

impl Component for TodoListView<'_> {
    fn render(&self) -> String {
        let items = self.todos.iter().fold(String::new(), |mut str, todo| {
            let _ = write!(str, "{}", Item { todo }.render());
            str
        });
        format!(
            r##"
            <div id="todo-list">
                <div class="todos">
                    {items}
                </div>
                <form
                    class="add"
                    hx-post="/todos"
                    hx-target="#todo-list"
                    hx-on::before-request="this.reset()"
                >
                    <label for="content">Content:</label>
                    <input id="content" name="content" value="{content}" required />
                    <button>Add Todo</button>
                </form>
            </div>
            "##,
            content = clean_text(self.content),
        )
    }
}
