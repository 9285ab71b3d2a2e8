//! `meta-wayland-data-device-primary.c`: the PRIMARY selection (middle-click paste).

use crate::patch::RuleSpec;

pub const PATH: &str = "src/wayland/meta-wayland-data-device-primary.c";

pub const SENTINELS: &[&str] = &[
    r"^static void\s+primary_device_set_selection\s*\(",
    r"^static void\s+owner_changed_cb\s*\(",
    r"^void\s+meta_wayland_data_device_primary_sync_focus\s*\(",
    r"meta_wayland_seat_get_input_focus_client\s*\(\s*seat\s*\)",
    r"&data_device->focus_resource_list",
];

pub const RULES: [RuleSpec; 2] = [
    RuleSpec {
        name: "remove-focus-check",
        summary: "primary_device_set_selection(): removed focus check (any client can set the primary selection)",
        lines: (184, 190),
        leading: concat!(
            "  if (source_resource)\n",
            "    source = wl_resource_get_user_data (source_resource);\n",
            "\n",
        ),
        original: concat!(
            "  if (wl_resource_get_client (resource) !=\n",
            "      meta_wayland_seat_get_input_focus_client (seat))\n",
            "    {\n",
            "      if (source)\n",
            "        meta_wayland_data_source_cancel (source);\n",
            "      return;\n",
            "    }\n",
            "\n",
        ),
        trailing: "  meta_wayland_data_device_primary_set_selection",
        replacement: concat!(
            "  /* === VMWARE_CLIPBOARD_PATCH ===\n",
            "   * REMOVED: Focus check that blocked primary selection writes from unfocused apps.\n",
            "   * X11 never had this restriction.\n",
            "   * Original code (lines 184-190):\n",
            "   *   if (wl_resource_get_client (resource) !=\n",
            "   *       meta_wayland_seat_get_input_focus_client (seat))\n",
            "   *     { if (source) meta_wayland_data_source_cancel (source); return; }\n",
            "   * === /VMWARE_CLIPBOARD_PATCH === */\n",
            "\n",
        ),
    },
    RuleSpec {
        name: "notify-all-clients",
        summary: "owner_changed_cb() (primary): now notifies ALL clients (both resource lists)",
        lines: (212, 233),
        leading: "  MetaWaylandSeat *seat = compositor->seat;\n",
        original: concat!(
            "  struct wl_resource *data_device_resource;\n",
            "  struct wl_client *focus_client;\n",
            "\n",
            "  focus_client = meta_wayland_seat_get_input_focus_client (seat);\n",
            "  if (!focus_client)\n",
            "    return;\n",
            "\n",
            "  if (selection_type == META_SELECTION_PRIMARY)\n",
            "    {\n",
            "      wl_resource_for_each (data_device_resource, &data_device->focus_resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_primary_offer (data_device,\n",
            "                                                     data_device_resource);\n",
            "            }\n",
            "\n",
            "          zwp_primary_selection_device_v1_send_selection (data_device_resource,\n",
            "                                                          offer);\n",
            "        }\n",
            "    }\n",
            "}",
        ),
        trailing: "",
        replacement: concat!(
            "  struct wl_resource *data_device_resource;\n",
            "\n",
            "  /* === VMWARE_CLIPBOARD_PATCH ===\n",
            "   * REMOVED: Focus check that blocked primary selection notifications.\n",
            "   * CHANGED: Now notify ALL clients, not just the focused one.\n",
            "   * Original code (lines 212-233) only iterated focus_resource_list.\n",
            "   * === /VMWARE_CLIPBOARD_PATCH === */\n",
            "\n",
            "  if (selection_type == META_SELECTION_PRIMARY)\n",
            "    {\n",
            "      /* Notify unfocused clients (resource_list) */\n",
            "      wl_resource_for_each (data_device_resource, &data_device->resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_primary_offer (data_device,\n",
            "                                                     data_device_resource);\n",
            "            }\n",
            "\n",
            "          zwp_primary_selection_device_v1_send_selection (data_device_resource,\n",
            "                                                          offer);\n",
            "        }\n",
            "\n",
            "      /* Notify focused client (focus_resource_list) */\n",
            "      wl_resource_for_each (data_device_resource, &data_device->focus_resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_primary_offer (data_device,\n",
            "                                                     data_device_resource);\n",
            "            }\n",
            "\n",
            "          zwp_primary_selection_device_v1_send_selection (data_device_resource,\n",
            "                                                          offer);\n",
            "        }\n",
            "    }\n",
            "}",
        ),
    },
];
